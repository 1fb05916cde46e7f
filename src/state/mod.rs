//! State module for tracking mirror run progress
//!
//! # Components
//!
//! - `RunPhase`: Phase of a run (pending, crawling, downloading assets, archiving, done)
//! - `PageOutcome`: What happened to one dispatched page
//! - `CrawlSets`: Frontier and visited set with atomic check-and-insert
//! - `AssetSet`: Deduplicated asset downloads collected during the crawl
//! - `ClaimSet`: Once-per-run guard (stylesheet scanning)

mod crawl_sets;
mod page_outcome;
mod run_phase;

// Re-export main types
pub use crawl_sets::{AssetSet, AssetTask, ClaimSet, CrawlSets};
pub use page_outcome::PageOutcome;
pub use run_phase::RunPhase;
