//! Sumi-Mirror main entry point
//!
//! This is the command-line interface for the Sumi-Mirror offline site mirror.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use sumi_mirror::config::{load_config_with_hash, validate, Config};
use sumi_mirror::decompose::decompose_mirror;
use sumi_mirror::output::{print_manifest, print_statistics};
use sumi_mirror::{mirror_site, normalize_url, MirrorError, MirrorOutcome};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Sumi-Mirror: An offline website mirror
///
/// Sumi-Mirror downloads a site's pages, stylesheets, scripts and images,
/// rewrites references so the copy browses offline, falls back to a headless
/// browser for client-rendered pages, and zips the result.
#[derive(Parser, Debug)]
#[command(name = "sumi-mirror")]
#[command(version = "1.0.0")]
#[command(about = "An offline website mirror", long_about = None)]
struct Cli {
    /// Start page; its origin bounds the crawl
    #[arg(value_name = "URL")]
    url: String,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum link depth from the start page
    #[arg(short, long)]
    depth: Option<u32>,

    /// Maximum concurrent page or asset downloads
    #[arg(short, long)]
    workers: Option<u32>,

    /// Directory that receives the run directory and archive
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Full User-Agent header value
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    /// Never launch the headless browser
    #[arg(long)]
    static_only: bool,

    /// Split mirrored pages into shared components and page content
    #[arg(long)]
    decompose: bool,

    /// Validate the configuration and show what would be mirrored
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    /// Applies command-line overrides on top of the file configuration
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(depth) = self.depth {
            config.crawler.max_depth = depth;
        }
        if let Some(workers) = self.workers {
            config.crawler.max_workers = workers;
        }
        if let Some(output) = &self.output {
            config.output.root = output.clone();
        }
        if let Some(user_agent) = &self.user_agent {
            config.user_agent.override_value = Some(user_agent.clone());
        }
        if self.static_only {
            config.dynamic.enabled = false;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };
    cli.apply_overrides(&mut config);
    validate(&config)?;

    if cli.dry_run {
        return handle_dry_run(&cli.url, &config);
    }

    let outcome = handle_mirror(config, &cli.url).await?;

    if cli.decompose {
        handle_decompose(&outcome)?;
    }
    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_mirror=info,warn"),
            1 => EnvFilter::new("sumi_mirror=debug,info"),
            2 => EnvFilter::new("sumi_mirror=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates input and shows what would be mirrored
fn handle_dry_run(url: &str, config: &Config) -> anyhow::Result<()> {
    let base = normalize_url(url)?;

    println!("=== Sumi-Mirror Dry Run ===\n");
    println!("Start page: {}", base);

    println!("\nCrawler Configuration:");
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Max workers: {}", config.crawler.max_workers);
    println!("  Request delay: {}ms", config.crawler.request_delay_ms);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nDynamic Rendering:");
    println!("  Enabled: {}", config.dynamic.enabled);
    println!("  Sparse threshold: {} chars", config.dynamic.sparse_threshold);
    println!("  Render timeout: {}s", config.dynamic.render_timeout_secs);

    println!("\nOutput: {}", config.output.root.display());

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the main mirror operation
async fn handle_mirror(config: Config, url: &str) -> anyhow::Result<MirrorOutcome> {
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling run");
            on_signal.cancel();
        }
    });

    match mirror_site(config, url, cancel).await {
        Ok(outcome) => {
            print_manifest(&outcome.manifest);
            println!();
            print_statistics(&outcome.stats);
            println!();
            println!("Run directory: {}", outcome.output_dir.display());
            println!("Archive: {}", outcome.archive_path.display());
            Ok(outcome)
        }
        Err(MirrorError::Cancelled) => {
            tracing::error!("Run cancelled");
            Err(MirrorError::Cancelled.into())
        }
        Err(e) => {
            tracing::error!("Mirror failed: {}", e);
            Err(e.into())
        }
    }
}

/// Handles --decompose: writes fragments next to the run directory
fn handle_decompose(outcome: &MirrorOutcome) -> anyhow::Result<()> {
    let target = components_dir(&outcome.output_dir, &outcome.run_id);
    let summary = decompose_mirror(&outcome.output_dir, &target)
        .with_context(|| format!("Failed to decompose into {}", target.display()))?;

    println!();
    println!("=== Components ===\n");
    println!("Shared: {}", summary.shared.join(", "));
    for page in &summary.pages {
        println!("  {:<24} {:<24} {}", page.name, page.route, page.source);
    }
    println!("\nWritten to: {}", target.display());
    Ok(())
}

fn components_dir(run_dir: &Path, run_id: &str) -> PathBuf {
    run_dir
        .parent()
        .unwrap_or(run_dir)
        .join(format!("{}-components", run_id))
}
