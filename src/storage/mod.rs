//! Storage module for persisting mirrored content
//!
//! This module handles all filesystem writes for a run, including:
//! - Creating the run directory and its category partitions
//! - Serialized, containment-checked file writes
//! - Path containment helpers for serving mirrored files back out

mod containment;
mod fs_store;

pub use containment::{archive_download_path, resolve_within, validate_file_name};
pub use fs_store::OutputStore;

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Path escapes output root: {0}")]
    OutsideRoot(PathBuf),

    #[error("Absolute path not allowed: {0}")]
    AbsolutePath(String),

    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    #[error("Not an archive: {0}")]
    NotAnArchive(String),

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
