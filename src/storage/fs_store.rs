use crate::storage::{StorageError, StorageResult};
use crate::url::ContentCategory;
use std::path::{Component, Path, PathBuf};
use tokio::sync::Mutex;

/// Output tree of one run
///
/// All writes go through [`OutputStore::save`], which refuses paths outside
/// the run directory and holds a run-wide lock so that directory creation
/// and file writes from concurrent workers never interleave.
#[derive(Debug)]
pub struct OutputStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl OutputStore {
    /// Creates the run directory and its category partitions
    ///
    /// # Arguments
    ///
    /// * `root` - The run directory; created if missing
    ///
    /// # Returns
    ///
    /// * `Ok(OutputStore)` - Directory tree is in place
    /// * `Err(StorageError)` - A directory could not be created
    pub fn create(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        for category in ContentCategory::ALL {
            let dir = root.join(category.dir_name());
            std::fs::create_dir_all(&dir).map_err(|source| StorageError::Io {
                path: dir.clone(),
                source,
            })?;
        }

        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns true if `path` lies inside the run directory
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.root)
            && !path
                .components()
                .any(|c| matches!(c, Component::ParentDir))
    }

    /// Writes `bytes` to `path`, creating parent directories as needed
    ///
    /// An existing file at `path` is overwritten.
    pub async fn save(&self, path: &Path, bytes: &[u8]) -> StorageResult<()> {
        if !self.contains(path) {
            return Err(StorageError::OutsideRoot(path.to_path_buf()));
        }

        let _guard = self.write_lock.lock().await;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StorageError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        tokio::fs::write(path, bytes)
            .await
            .map_err(|source| StorageError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        tracing::trace!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }
}
