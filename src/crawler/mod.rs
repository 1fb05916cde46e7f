//! Crawler module for mirroring a site
//!
//! This module contains the core mirroring logic, including:
//! - Paced HTTP fetching with a headless-browser fallback
//! - Reference extraction from HTML and CSS
//! - Reference rewriting for offline browsing
//! - Bounded concurrent task scheduling
//! - Overall run coordination

mod coordinator;
mod fetcher;
mod parser;
mod rewriter;
mod scheduler;

pub use coordinator::{mirror_site, run_scrape_workflow, Coordinator, MirrorOutcome};
pub use fetcher::{
    build_http_client, is_html_content_type, visible_text_len, ContentFetcher, FetchResult,
    PageContent, RequestPacer, StaticFetcher,
};
pub use parser::{
    category_for, extract_references, resolve_target, scan_css_urls, Reference,
    REFERENCE_ATTRIBUTES,
};
pub use rewriter::{relative_link, rewrite_document, PageContext, RewriteError, RewrittenPage};
pub use scheduler::WorkerPool;
