//! Run statistics
//!
//! Counters are updated concurrently by workers and read once at the end of
//! the run through [`RunStatistics::snapshot`].

use crate::state::PageOutcome;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters for one run
#[derive(Debug, Default)]
pub struct RunStatistics {
    pages_saved: AtomicU64,
    pages_skipped: AtomicU64,
    pages_failed: AtomicU64,
    dynamic_attempts: AtomicU64,
    dynamic_successes: AtomicU64,
    stylesheets_scanned: AtomicU64,
    assets_downloaded: AtomicU64,
    assets_failed: AtomicU64,
    write_failures: AtomicU64,
}

/// Point-in-time copy of [`RunStatistics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatisticsSnapshot {
    pub pages_saved: u64,
    pub pages_skipped: u64,
    pub pages_failed: u64,
    pub dynamic_attempts: u64,
    pub dynamic_successes: u64,
    pub stylesheets_scanned: u64,
    pub assets_downloaded: u64,
    pub assets_failed: u64,
    pub write_failures: u64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl RunStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome of one dispatched page
    pub fn record_page(&self, outcome: PageOutcome) {
        if outcome.is_success() {
            bump(&self.pages_saved);
        } else if outcome.is_skipped() {
            bump(&self.pages_skipped);
        } else {
            bump(&self.pages_failed);
        }
        if outcome == PageOutcome::WriteFailed {
            bump(&self.write_failures);
        }
    }

    pub fn record_dynamic_attempt(&self, succeeded: bool) {
        bump(&self.dynamic_attempts);
        if succeeded {
            bump(&self.dynamic_successes);
        }
    }

    pub fn record_stylesheet_scanned(&self) {
        bump(&self.stylesheets_scanned);
    }

    pub fn record_asset(&self, downloaded: bool) {
        if downloaded {
            bump(&self.assets_downloaded);
        } else {
            bump(&self.assets_failed);
        }
    }

    pub fn record_write_failure(&self) {
        bump(&self.write_failures);
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatisticsSnapshot {
            pages_saved: load(&self.pages_saved),
            pages_skipped: load(&self.pages_skipped),
            pages_failed: load(&self.pages_failed),
            dynamic_attempts: load(&self.dynamic_attempts),
            dynamic_successes: load(&self.dynamic_successes),
            stylesheets_scanned: load(&self.stylesheets_scanned),
            assets_downloaded: load(&self.assets_downloaded),
            assets_failed: load(&self.assets_failed),
            write_failures: load(&self.write_failures),
        }
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &StatisticsSnapshot) {
    println!("=== Mirror Statistics ===\n");

    println!("Pages:");
    println!("  Saved: {}", stats.pages_saved);
    println!("  Skipped: {}", stats.pages_skipped);
    println!("  Failed: {}", stats.pages_failed);
    println!();

    println!("Dynamic rendering:");
    println!("  Attempts: {}", stats.dynamic_attempts);
    println!("  Successes: {}", stats.dynamic_successes);
    println!();

    println!("Assets:");
    println!("  Stylesheets scanned: {}", stats.stylesheets_scanned);
    println!("  Downloaded: {}", stats.assets_downloaded);
    println!("  Failed: {}", stats.assets_failed);

    if stats.write_failures > 0 {
        println!();
        println!("Write failures: {}", stats.write_failures);
    }
}
