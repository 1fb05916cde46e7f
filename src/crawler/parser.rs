//! HTML and CSS reference extraction
//!
//! This module finds everything a mirrored page depends on:
//! - Hyperlinks (`<a href>`) that become candidate pages
//! - Stylesheets (`<link href>`), scripts (`<script src>`) and images
//!   (`<img src>`) that become asset downloads
//! - Resources referenced from inside stylesheets via `url(...)`
//!
//! Only references that resolve to the run's origin are returned.

use crate::url::{is_same_origin, resolve_reference, ContentCategory};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

/// Elements and attributes that carry references, in extraction order
pub const REFERENCE_ATTRIBUTES: [(&str, &str); 4] =
    [("a", "href"), ("link", "href"), ("script", "src"), ("img", "src")];

static CSS_URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)url\(\s*['"]?(.*?)['"]?\s*\)"#).expect("Invalid CSS url() regex")
});

/// A same-origin reference found in a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Tag name of the referencing element
    pub tag: &'static str,

    /// Attribute value as written in the markup
    pub raw: String,

    /// Resolved absolute target, fragment removed
    pub target: Url,

    /// Output partition of the target
    pub category: ContentCategory,
}

impl Reference {
    /// Returns true for `<a href>` references
    pub fn is_hyperlink(&self) -> bool {
        self.tag == "a"
    }

    /// Returns true for `<link href>` references, which are scanned as CSS
    pub fn is_stylesheet(&self) -> bool {
        self.tag == "link"
    }
}

/// Output partition for a reference carried by `tag`
pub fn category_for(tag: &str) -> ContentCategory {
    if tag.eq_ignore_ascii_case("a") {
        ContentCategory::Html
    } else {
        ContentCategory::for_tag(tag)
    }
}

/// Resolves one attribute value the way both extraction and rewriting see it
///
/// # Returns
///
/// * `Some((Url, ContentCategory))` - Same-origin target and its partition
/// * `None` - Fragment-only, unresolvable, non-HTTP or off-origin
pub fn resolve_target(
    tag: &str,
    raw: &str,
    page_url: &Url,
    base_url: &Url,
) -> Option<(Url, ContentCategory)> {
    let target = resolve_reference(raw, page_url)?;
    if !is_same_origin(&target, base_url) {
        return None;
    }
    Some((target, category_for(tag)))
}

/// Extracts every same-origin reference from a page
///
/// # Arguments
///
/// * `html` - The page markup
/// * `page_url` - URL the page was fetched from; relative references resolve against it
/// * `base_url` - The run's base URL; defines the origin
///
/// # Returns
///
/// References grouped by element type, in document order within each group
///
/// # Example
///
/// ```
/// use sumi_mirror::crawler::extract_references;
/// use url::Url;
///
/// let html = r#"<a href="/about">About</a><img src="https://cdn.example.net/x.png">"#;
/// let page = Url::parse("https://example.com/").unwrap();
/// let refs = extract_references(html, &page, &page);
/// assert_eq!(refs.len(), 1);
/// assert_eq!(refs[0].target.as_str(), "https://example.com/about");
/// ```
pub fn extract_references(html: &str, page_url: &Url, base_url: &Url) -> Vec<Reference> {
    let document = Html::parse_document(html);
    let mut references = Vec::new();

    for (tag, attr) in REFERENCE_ATTRIBUTES {
        let Ok(selector) = Selector::parse(&format!("{}[{}]", tag, attr)) else {
            continue;
        };

        for element in document.select(&selector) {
            let Some(raw) = element.value().attr(attr) else {
                continue;
            };
            match resolve_target(tag, raw, page_url, base_url) {
                Some((target, category)) => references.push(Reference {
                    tag,
                    raw: raw.to_string(),
                    target,
                    category,
                }),
                None => tracing::trace!("Ignoring <{} {}=\"{}\">", tag, attr, raw),
            }
        }
    }

    references
}

/// Scans stylesheet text for `url(...)` references
///
/// Matches are case-insensitive with optional single or double quotes.
/// Each match resolves against the stylesheet's own URL; off-origin and
/// non-HTTP results (such as `data:` URIs) are dropped. The result holds
/// each URL once, in first-seen order.
pub fn scan_css_urls(css: &str, stylesheet_url: &Url, base_url: &Url) -> Vec<Url> {
    let mut found: Vec<Url> = Vec::new();

    for capture in CSS_URL_REGEX.captures_iter(css) {
        let Some(raw) = capture.get(1).map(|m| m.as_str()) else {
            continue;
        };
        let Some(target) = resolve_reference(raw, stylesheet_url) else {
            continue;
        };
        if is_same_origin(&target, base_url) && !found.contains(&target) {
            found.push(target);
        }
    }

    found
}
