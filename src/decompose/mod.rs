//! Decomposition of a mirrored site into reusable fragments
//!
//! This module handles:
//! - Splitting pages into shared components (header, footer, nav) and page content
//! - Naming components and page routes
//! - Writing the fragments of a whole run directory to disk
//! - The contract of the external generator that turns fragments into code

mod fragments;
pub mod generator;

pub use fragments::{component_name, decompose_html, page_component, DecomposedPage, SHARED_TAGS};
pub use generator::{
    generate_with_retry, ComponentRequest, GenerateError, GeneratedComponent, RetryPolicy,
    TextGenerator,
};

use crate::output::sorted_files;
use crate::url::ContentCategory;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// One page component written by [`decompose_mirror`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageEntry {
    /// Component name, e.g. `AboutPage`
    pub name: String,

    /// Route, e.g. `/about`
    pub route: String,

    /// Source file, relative to the run's `html/` directory
    pub source: String,
}

/// What [`decompose_mirror`] wrote
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecomposeSummary {
    /// Shared component names, sorted
    pub shared: Vec<String>,

    /// Page components in source order
    pub pages: Vec<PageEntry>,
}

/// File stem naming a mirrored page
///
/// `relative` is `<host>/.../<file>.html`. A nested `index.html` is named
/// after its directory, so `example.com/about/index.html` is `about`.
fn page_stem(relative: &str) -> String {
    let segments: Vec<&str> = relative.split('/').collect();
    let file = segments.last().copied().unwrap_or_default();
    let stem = Path::new(file)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    if stem.eq_ignore_ascii_case("index") && segments.len() > 2 {
        segments[segments.len() - 2].to_string()
    } else {
        stem
    }
}

/// Decomposes every mirrored page of a run
///
/// Walks `<run_dir>/html` in sorted order. Each shared component is written
/// once, from the first page that has it, to `<target_dir>/shared/<Name>.html`;
/// page content goes to `<target_dir>/pages/<Name>Page.html`. Pages with the
/// same stem share a component name and the later one wins.
///
/// # Arguments
///
/// * `run_dir` - A finished run directory
/// * `target_dir` - Where the fragments are written; created if missing
pub fn decompose_mirror(run_dir: &Path, target_dir: &Path) -> std::io::Result<DecomposeSummary> {
    let html_dir = run_dir.join(ContentCategory::Html.dir_name());
    let shared_dir = target_dir.join("shared");
    let pages_dir = target_dir.join("pages");
    fs::create_dir_all(&shared_dir)?;
    fs::create_dir_all(&pages_dir)?;

    let mut shared = BTreeSet::new();
    let mut pages = Vec::new();

    if !html_dir.is_dir() {
        tracing::warn!("No html directory under {}", run_dir.display());
        return Ok(DecomposeSummary::default());
    }

    for (relative, path) in sorted_files(&html_dir)? {
        if !relative.to_ascii_lowercase().ends_with(".html") {
            continue;
        }
        let bytes = fs::read(&path)?;
        let page = decompose_html(&String::from_utf8_lossy(&bytes));

        for (name, fragment) in page.shared {
            if shared.insert(name.clone()) {
                fs::write(shared_dir.join(format!("{}.html", name)), fragment)?;
            }
        }

        let Some(content) = page.content else {
            continue;
        };
        let (name, route) = page_component(&page_stem(&relative));
        fs::write(pages_dir.join(format!("{}.html", name)), content)?;
        tracing::debug!("Decomposed {} into {}", relative, name);

        pages.push(PageEntry {
            name,
            route,
            source: relative,
        });
    }

    tracing::info!(
        "Decomposed {} pages, {} shared components into {}",
        pages.len(),
        shared.len(),
        target_dir.display()
    );
    Ok(DecomposeSummary {
        shared: shared.into_iter().collect(),
        pages,
    })
}
