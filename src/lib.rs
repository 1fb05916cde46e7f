//! Sumi-Mirror: an offline website mirror
//!
//! This crate mirrors a website to local storage (pages, stylesheets, scripts,
//! images), rewrites references so the copy browses offline, falls back to a
//! headless browser for client-rendered pages, and packages each run into a
//! zip archive.

pub mod config;
pub mod crawler;
pub mod decompose;
pub mod output;
pub mod render;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Run-level error type for Sumi-Mirror operations
///
/// Per-page and per-asset failures never surface here; they are logged and
/// the run continues. Only setup failures and cancellation abort a run.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("Failed to prepare output directory {path}: {source}")]
    Setup {
        path: String,
        source: std::io::Error,
    },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Archive error for {path}: {message}")]
    Archive { path: String, message: String },

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Invalid run phase transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::RunPhase,
        to: state::RunPhase,
    },

    #[error("Run was cancelled")]
    Cancelled,

    #[error("Worker task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Sumi-Mirror operations
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{mirror_site, run_scrape_workflow, Coordinator, MirrorOutcome};
pub use output::{FileManifest, ManifestEntry};
pub use state::RunPhase;
pub use url::{local_path, normalize_url, ContentCategory};
