//! Mapping from remote URLs to locations in the output tree
//!
//! The mapping keeps the site's directory structure: `https://example.com/a/b.css`
//! becomes `<root>/css/example.com/a/b.css`. Path segments are stored
//! percent-decoded; only characters that are illegal in file names on common
//! platforms are replaced.

use crate::url::domain::host_label;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// Characters replaced with `_` in every path segment
const ILLEGAL_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*', '\\', '/'];

/// Content category; each one owns a top-level directory of the output tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ContentCategory {
    Html,
    Css,
    Js,
    Images,
    Assets,
}

impl ContentCategory {
    /// All categories, in output-tree order
    pub const ALL: [ContentCategory; 5] = [
        ContentCategory::Html,
        ContentCategory::Css,
        ContentCategory::Js,
        ContentCategory::Images,
        ContentCategory::Assets,
    ];

    /// Directory name under the run directory
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Css => "css",
            Self::Js => "js",
            Self::Images => "images",
            Self::Assets => "assets",
        }
    }

    /// Parses a directory name back into a category
    pub fn from_dir_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.dir_name() == name)
    }

    /// Category of a non-hyperlink reference, by tag name
    pub fn for_tag(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "link" => Self::Css,
            "script" => Self::Js,
            "img" => Self::Images,
            _ => Self::Assets,
        }
    }
}

impl fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Computes the local path for a remote URL
///
/// # Algorithm
///
/// 1. Concatenate the host (with explicit port) and the URL path
/// 2. A bare origin or a path ending in `/` gets `index.html` appended
/// 3. An HTML page whose last segment has no extension becomes a directory
///    with its own `index.html`, so `/about` and `/about/team` can coexist
/// 4. Segments are percent-decoded; empty, `.` and `..` segments are dropped
///    so the result never leaves `output_root/category`
/// 5. Characters in [`ILLEGAL_CHARS`] are replaced with `_` per segment
///
/// The query string is not part of the mapping; two URLs differing only in
/// their query share a path and the later write wins.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use sumi_mirror::url::{local_path, ContentCategory};
/// use url::Url;
///
/// let url = Url::parse("https://example.com/blog/").unwrap();
/// let path = local_path(&url, Path::new("/out"), ContentCategory::Html);
/// assert_eq!(path, Path::new("/out/html/example.com/blog/index.html"));
///
/// let url = Url::parse("https://example.com/blog/first-post").unwrap();
/// let path = local_path(&url, Path::new("/out"), ContentCategory::Html);
/// assert_eq!(path, Path::new("/out/html/example.com/blog/first-post/index.html"));
/// ```
pub fn local_path(url: &Url, output_root: &Path, category: ContentCategory) -> PathBuf {
    let host = host_label(url).unwrap_or_default();

    let mut segments: Vec<String> = url
        .path()
        .split('/')
        .map(decode_segment)
        .filter(|segment| !segment.is_empty() && segment != "." && segment != "..")
        .map(|segment| sanitize_segment(&segment))
        .collect();

    let is_directory = segments.is_empty() || url.path().ends_with('/');
    let is_extensionless_page = category == ContentCategory::Html
        && segments.last().is_some_and(|last| !last.contains('.'));
    if is_directory || is_extensionless_page {
        segments.push("index.html".to_string());
    }

    let mut path = output_root.join(category.dir_name());
    if !host.is_empty() {
        path.push(sanitize_segment(&host));
    }
    path.extend(segments);
    path
}

fn decode_segment(raw: &str) -> String {
    match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_string(),
    }
}

/// Replaces characters that cannot appear in a file name
pub fn sanitize_segment(segment: &str) -> String {
    segment
        .chars()
        .map(|c| {
            if ILLEGAL_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect()
}
