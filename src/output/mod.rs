//! Output module for packaging and summarizing a finished run
//!
//! This module handles:
//! - Building the sorted file manifest of a run directory
//! - Packaging the run directory into a zip archive
//! - Recording and printing run statistics

mod archive;
mod manifest;
pub mod stats;

pub use archive::archive_directory;
pub use manifest::{build_manifest, sorted_files, FileManifest, ManifestEntry};
pub use stats::{print_statistics, RunStatistics, StatisticsSnapshot};

/// Prints the manifest to stdout, one file per line
///
/// # Arguments
///
/// * `manifest` - The manifest to display
pub fn print_manifest(manifest: &FileManifest) {
    println!("=== Files ({}) ===\n", manifest.len());
    for entry in &manifest.entries {
        println!("  {:>10}  {}", entry.bytes, entry.relative_path);
    }
    println!();
    println!("Total: {} bytes", manifest.total_bytes());
}
