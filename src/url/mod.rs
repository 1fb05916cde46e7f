//! URL handling module for Sumi-Mirror
//!
//! This module provides URL normalization, reference resolution, same-origin
//! checks, and the mapping from remote URLs to local output paths.

mod domain;
mod normalize;
mod path_mapper;

// Re-export main functions
pub use domain::{extract_domain, host_label};
pub use normalize::{is_same_origin, is_same_page, normalize_url, resolve_reference};
pub use path_mapper::{local_path, sanitize_segment, ContentCategory};

use url::Url;

/// Builds the run identifier `<origin-host>_<unix-timestamp>`
///
/// The host keeps its explicit port and is sanitized for use as a
/// directory name.
///
/// # Examples
///
/// ```
/// use sumi_mirror::url::run_id;
/// use url::Url;
///
/// let base = Url::parse("http://127.0.0.1:8080/").unwrap();
/// assert_eq!(run_id(&base, 1_700_000_000), "127.0.0.1_8080_1700000000");
/// ```
pub fn run_id(base: &Url, timestamp: i64) -> String {
    format!("{}_{}", site_label(base), timestamp)
}

/// Sanitized host label used in run directory and archive names
pub fn site_label(base: &Url) -> String {
    sanitize_segment(&host_label(base).unwrap_or_else(|| "site".to_string()))
}
