//! File manifest of a finished run
//!
//! The manifest lists every regular file under the run directory in sorted
//! order, with its `/`-separated path relative to the run directory.

use crate::url::ContentCategory;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One mirrored file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
    /// File name without directories
    pub name: String,

    /// Path relative to the run directory, `/`-separated
    pub relative_path: String,

    /// Category partition the file lives in, if any
    pub category: Option<ContentCategory>,

    /// File size in bytes
    pub bytes: u64,

    /// Hex-encoded SHA-256 of the file contents
    pub sha256: String,
}

/// All files produced by one run
#[derive(Debug, Clone, Default, Serialize)]
pub struct FileManifest {
    pub run_id: String,
    pub root: PathBuf,
    pub entries: Vec<ManifestEntry>,
}

impl FileManifest {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries belonging to one category partition
    pub fn in_category(&self, category: ContentCategory) -> impl Iterator<Item = &ManifestEntry> {
        self.entries
            .iter()
            .filter(move |e| e.category == Some(category))
    }

    /// Total size of all entries
    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.bytes).sum()
    }
}

/// Lists the regular files under `root` in sorted order, as `/`-joined
/// relative paths paired with their absolute location
pub fn sorted_files(root: &Path) -> std::io::Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push((name, entry.path().to_path_buf()));
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

/// Builds the manifest for a run directory
///
/// # Arguments
///
/// * `run_id` - Identifier of the run
/// * `root` - The run directory
///
/// # Returns
///
/// * `Ok(FileManifest)` - Entries sorted by relative path
/// * `Err(io::Error)` - The directory could not be walked or a file read
pub fn build_manifest(run_id: &str, root: &Path) -> std::io::Result<FileManifest> {
    let mut entries = Vec::new();

    for (relative_path, path) in sorted_files(root)? {
        let contents = std::fs::read(&path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let category = relative_path
            .split('/')
            .next()
            .and_then(ContentCategory::from_dir_name);

        entries.push(ManifestEntry {
            name,
            relative_path,
            category,
            bytes: contents.len() as u64,
            sha256: hex::encode(Sha256::digest(&contents)),
        });
    }

    Ok(FileManifest {
        run_id: run_id.to_string(),
        root: root.to_path_buf(),
        entries,
    })
}
