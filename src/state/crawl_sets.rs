//! Shared URL collections for one mirror run
//!
//! - `CrawlSets`: frontier and visited set behind a single lock, so that
//!   check-and-insert on visited is atomic with the frontier update
//! - `AssetSet`: deduplicated asset downloads keyed by remote URL
//! - `ClaimSet`: first-caller-wins set, used for once-per-run work such as
//!   scanning a stylesheet

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use url::Url;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicking worker cannot leave the sets half-updated; every critical
    // section is a single insert or remove.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
struct Sets {
    frontier: BTreeSet<Url>,
    visited: HashSet<Url>,
}

/// Frontier and visited set of one run
///
/// The frontier never holds a URL that is already visited: `enqueue` refuses
/// visited URLs and `mark_visited` removes the URL from the frontier in the
/// same critical section.
#[derive(Debug, Default)]
pub struct CrawlSets {
    inner: Mutex<Sets>,
}

impl CrawlSets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a URL to the frontier unless it was already dispatched
    ///
    /// # Returns
    ///
    /// * `true` - The URL was newly added
    /// * `false` - The URL is visited or already pending
    pub fn enqueue(&self, url: Url) -> bool {
        let mut sets = lock(&self.inner);
        if sets.visited.contains(&url) {
            return false;
        }
        sets.frontier.insert(url)
    }

    /// Marks a URL as dispatched for fetching
    ///
    /// This is the only deduplication point of the crawl. When several
    /// workers race on the same URL exactly one of them gets `true`.
    pub fn mark_visited(&self, url: &Url) -> bool {
        let mut sets = lock(&self.inner);
        if !sets.visited.insert(url.clone()) {
            return false;
        }
        sets.frontier.remove(url);
        true
    }

    pub fn is_visited(&self, url: &Url) -> bool {
        lock(&self.inner).visited.contains(url)
    }

    /// Takes everything pending for the next depth level, in sorted order
    pub fn drain_pending(&self) -> Vec<Url> {
        let mut sets = lock(&self.inner);
        let frontier = std::mem::take(&mut sets.frontier);
        frontier
            .into_iter()
            .filter(|url| !sets.visited.contains(url))
            .collect()
    }

    pub fn frontier_len(&self) -> usize {
        lock(&self.inner).frontier.len()
    }

    pub fn visited_len(&self) -> usize {
        lock(&self.inner).visited.len()
    }

    /// Returns true if no URL is both pending and visited
    pub fn is_consistent(&self) -> bool {
        let sets = lock(&self.inner);
        sets.frontier.iter().all(|url| !sets.visited.contains(url))
    }
}

/// One pending asset download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetTask {
    /// Remote asset URL
    pub url: Url,

    /// Destination inside the run directory
    pub path: PathBuf,
}

/// Deduplicated set of asset downloads, keyed by remote URL
#[derive(Debug, Default)]
pub struct AssetSet {
    tasks: Mutex<BTreeMap<Url, AssetTask>>,
}

impl AssetSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an asset; returns false if the URL was already recorded
    pub fn insert(&self, url: Url, path: PathBuf) -> bool {
        let mut tasks = lock(&self.tasks);
        if tasks.contains_key(&url) {
            return false;
        }
        tasks.insert(url.clone(), AssetTask { url, path });
        true
    }

    /// All recorded tasks, sorted by URL
    pub fn tasks(&self) -> Vec<AssetTask> {
        lock(&self.tasks).values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.tasks).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.tasks).is_empty()
    }
}

/// Set where only the first `claim` of a URL succeeds
#[derive(Debug, Default)]
pub struct ClaimSet {
    claimed: Mutex<HashSet<Url>>,
}

impl ClaimSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&self, url: &Url) -> bool {
        lock(&self.claimed).insert(url.clone())
    }
}
