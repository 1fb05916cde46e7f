//! Zip packaging of a run directory

use crate::output::manifest::sorted_files;
use crate::MirrorError;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Packages every regular file under `source_dir` into a deflate zip
///
/// Entries are named by their `/`-separated path relative to `source_dir`
/// and written in lexicographic order, so two identical trees always give
/// the same entry sequence. The archive itself is skipped if it happens to
/// live inside `source_dir`.
///
/// # Arguments
///
/// * `source_dir` - Directory to package
/// * `archive_path` - Destination file; overwritten if present
///
/// # Returns
///
/// * `Ok(PathBuf)` - The archive path
/// * `Err(MirrorError)` - Walking, reading or writing failed
pub fn archive_directory(source_dir: &Path, archive_path: &Path) -> Result<PathBuf, MirrorError> {
    let files = sorted_files(source_dir).map_err(|e| MirrorError::Archive {
        path: source_dir.display().to_string(),
        message: e.to_string(),
    })?;

    if let Some(parent) = archive_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(archive_path).map_err(|e| MirrorError::Archive {
        path: archive_path.display().to_string(),
        message: e.to_string(),
    })?;

    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut count = 0usize;
    for (name, path) in files {
        if path == archive_path {
            continue;
        }
        let contents = std::fs::read(&path)?;
        writer.start_file(name, options)?;
        writer.write_all(&contents)?;
        count += 1;
    }
    writer.finish()?;

    tracing::info!(
        "Archived {} files from {} into {}",
        count,
        source_dir.display(),
        archive_path.display()
    );
    Ok(archive_path.to_path_buf())
}
