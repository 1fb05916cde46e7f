//! Path containment checks for the download surface
//!
//! These functions never touch the filesystem; they reject inputs lexically
//! so a caller can refuse a request before opening anything.

use crate::storage::{StorageError, StorageResult};
use std::path::{Component, Path, PathBuf};

/// Resolves a client-supplied relative path under `root`
///
/// # Arguments
///
/// * `root` - Directory the result must stay inside
/// * `relative` - `/`-separated path as listed in the manifest
///
/// # Returns
///
/// * `Ok(PathBuf)` - `root` joined with the normalized relative path
/// * `Err(StorageError)` - The input is absolute or contains `..`
pub fn resolve_within(root: &Path, relative: &str) -> StorageResult<PathBuf> {
    if relative.starts_with('/') || relative.starts_with('\\') {
        return Err(StorageError::AbsolutePath(relative.to_string()));
    }

    let candidate = Path::new(relative);
    let mut resolved = root.to_path_buf();
    for component in candidate.components() {
        match component {
            Component::Normal(part) => {
                // Backslashes are separators on Windows but not here
                if part.to_string_lossy().contains('\\') {
                    return Err(StorageError::OutsideRoot(candidate.to_path_buf()));
                }
                resolved.push(part);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(StorageError::OutsideRoot(candidate.to_path_buf()));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(StorageError::AbsolutePath(relative.to_string()));
            }
        }
    }

    if resolved == root {
        return Err(StorageError::InvalidFileName(relative.to_string()));
    }
    Ok(resolved)
}

/// Checks that `name` is a single plain file name
pub fn validate_file_name(name: &str) -> StorageResult<()> {
    let invalid = name.is_empty()
        || name == "."
        || name.contains("..")
        || name.contains('/')
        || name.contains('\\')
        || name.chars().any(|c| c.is_control());

    if invalid {
        return Err(StorageError::InvalidFileName(name.to_string()));
    }
    Ok(())
}

/// Resolves an archive download request
///
/// The file must be a direct child of `root` and end in `.zip`.
pub fn archive_download_path(root: &Path, file_name: &str) -> StorageResult<PathBuf> {
    validate_file_name(file_name)?;
    if !file_name.to_ascii_lowercase().ends_with(".zip") {
        return Err(StorageError::NotAnArchive(file_name.to_string()));
    }
    Ok(root.join(file_name))
}
