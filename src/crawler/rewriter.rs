//! Reference rewriting for offline browsing
//!
//! Every same-origin reference attribute is replaced by the path of its
//! target's local copy, relative to the directory of the page being written.
//! Off-origin and fragment-only references are left untouched.

use crate::crawler::parser::{resolve_target, REFERENCE_ATTRIBUTES};
use crate::url::local_path;
use lol_html::{element, HtmlRewriter, Settings};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use url::Url;

/// Errors that can occur while rewriting a page
#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("HTML rewrite error: {0}")]
    Rewrite(String),

    #[error("Invalid UTF-8 in rewritten HTML: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// A page after rewriting
#[derive(Debug, Clone)]
pub struct RewrittenPage {
    pub html: String,

    /// Number of attributes replaced
    pub rewritten: usize,
}

/// Everything the rewriter needs to know about the page being written
#[derive(Debug, Clone, Copy)]
pub struct PageContext<'a> {
    /// URL the page was fetched from
    pub page_url: &'a Url,

    /// The run's base URL; defines the origin
    pub base_url: &'a Url,

    /// Run directory
    pub output_root: &'a Path,

    /// Where this page will be written
    pub page_path: &'a Path,
}

/// Relative path from the directory of `from_file` to `to_file`, `/`-separated
///
/// Falls back to `to_file` itself (with `/` separators) when no relative
/// path exists.
pub fn relative_link(from_file: &Path, to_file: &Path) -> String {
    from_file
        .parent()
        .and_then(|from_dir| pathdiff::diff_paths(to_file, from_dir))
        .map(|relative| {
            relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/")
        })
        .filter(|relative| !relative.is_empty())
        .unwrap_or_else(|| to_file.to_string_lossy().replace('\\', "/"))
}

/// Rewrites `a[href]`, `link[href]`, `script[src]` and `img[src]` in one pass
///
/// # Arguments
///
/// * `html` - The page markup
/// * `ctx` - Page and run locations
///
/// # Returns
///
/// * `Ok(RewrittenPage)` - Serialized markup and the number of replacements
/// * `Err(RewriteError)` - The markup could not be processed
pub fn rewrite_document(html: &str, ctx: PageContext<'_>) -> Result<RewrittenPage, RewriteError> {
    let mut output = Vec::with_capacity(html.len());
    let rewritten = AtomicUsize::new(0);
    let counter = &rewritten;

    let handlers = REFERENCE_ATTRIBUTES
        .iter()
        .map(|&(tag, attr)| {
            element!(format!("{}[{}]", tag, attr), move |el| {
                let Some(raw) = el.get_attribute(attr) else {
                    return Ok(());
                };
                if let Some((target, category)) =
                    resolve_target(tag, &raw, ctx.page_url, ctx.base_url)
                {
                    let target_path = local_path(&target, ctx.output_root, category);
                    el.set_attribute(attr, &relative_link(ctx.page_path, &target_path))?;
                    counter.fetch_add(1, Ordering::Relaxed);
                }
                Ok(())
            })
        })
        .collect();

    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: handlers,
            ..Settings::default()
        },
        |c: &[u8]| output.extend_from_slice(c),
    );

    rewriter
        .write(html.as_bytes())
        .map_err(|e| RewriteError::Rewrite(e.to_string()))?;
    rewriter
        .end()
        .map_err(|e| RewriteError::Rewrite(e.to_string()))?;

    Ok(RewrittenPage {
        html: String::from_utf8(output)?,
        rewritten: rewritten.load(Ordering::Relaxed),
    })
}
