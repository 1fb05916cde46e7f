//! Crawler coordinator - main mirror orchestration logic
//!
//! This module contains the run loop that coordinates all aspects of a
//! mirror run, including:
//! - Preparing a unique run directory
//! - Crawling depth levels in order over a bounded worker pool
//! - Fetching, extracting, rewriting and persisting each page
//! - Downloading the collected assets once crawling is over
//! - Archiving the run directory and building its manifest

use crate::config::{validate, Config};
use crate::crawler::fetcher::{ContentFetcher, FetchResult, PageContent, StaticFetcher};
use crate::crawler::parser::{extract_references, scan_css_urls};
use crate::crawler::rewriter::{rewrite_document, PageContext};
use crate::crawler::scheduler::WorkerPool;
use crate::output::{
    archive_directory, build_manifest, FileManifest, RunStatistics, StatisticsSnapshot,
};
use crate::render::{self, RenderOptions, Renderer};
use crate::state::{AssetSet, AssetTask, ClaimSet, CrawlSets, PageOutcome, RunPhase};
use crate::storage::{OutputStore, StorageError};
use crate::url::{
    is_same_page, local_path, normalize_url, run_id, site_label, ContentCategory,
};
use crate::MirrorError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use url::Url;

/// Result of a finished run
#[derive(Debug, Clone)]
pub struct MirrorOutcome {
    /// `<site>_<unix-timestamp>`, possibly with a `-N` suffix
    pub run_id: String,

    /// The run directory
    pub output_dir: PathBuf,

    /// Every file under the run directory
    pub manifest: FileManifest,

    /// The zip archive next to the run directory
    pub archive_path: PathBuf,

    pub stats: StatisticsSnapshot,
}

/// State shared by every page and asset task of a run
struct RunContext {
    base_url: Url,
    max_depth: u32,
    store: OutputStore,
    fetcher: ContentFetcher,
    sets: CrawlSets,
    assets: AssetSet,
    scanned_stylesheets: ClaimSet,
    stats: Arc<RunStatistics>,
}

impl RunContext {
    /// One page unit of work: fetch, extract, rewrite, persist
    async fn process_page(&self, url: Url, depth: u32) -> PageOutcome {
        if depth > self.max_depth {
            return PageOutcome::DepthExceeded;
        }
        if !self.sets.mark_visited(&url) {
            return PageOutcome::AlreadyVisited;
        }

        let (html, source_url) = match self.fetcher.fetch_page(&url).await {
            PageContent::Html {
                html,
                final_url,
                rendered,
            } => {
                tracing::debug!("Fetched {} (rendered: {})", url, rendered);
                (html, final_url)
            }
            PageContent::NotHtml { content_type } => {
                tracing::warn!("Skipping {}: not HTML ({})", url, content_type);
                return PageOutcome::NotHtml;
            }
            PageContent::Unavailable => {
                tracing::warn!("Skipping {}: no usable content", url);
                return PageOutcome::NoContent;
            }
        };

        let root = self.store.root();
        let references = extract_references(&html, &source_url, &self.base_url);
        let mut stylesheets = Vec::new();

        for reference in &references {
            if reference.is_hyperlink() {
                if depth < self.max_depth
                    && !is_same_page(&reference.target, &url)
                    && self.sets.enqueue(reference.target.clone())
                {
                    tracing::trace!("Queued {}", reference.target);
                }
                continue;
            }

            let path = local_path(&reference.target, root, reference.category);
            self.assets.insert(reference.target.clone(), path);
            if reference.is_stylesheet() && self.scanned_stylesheets.claim(&reference.target) {
                stylesheets.push(reference.target.clone());
            }
        }

        for stylesheet in stylesheets {
            self.scan_stylesheet(&stylesheet).await;
        }

        let page_path = local_path(&url, root, ContentCategory::Html);
        let page = match rewrite_document(
            &html,
            PageContext {
                page_url: &source_url,
                base_url: &self.base_url,
                output_root: root,
                page_path: &page_path,
            },
        ) {
            Ok(page) => page,
            Err(e) => {
                tracing::error!("Failed to rewrite {}: {}", url, e);
                return PageOutcome::RewriteFailed;
            }
        };

        if let Err(e) = self.store.save(&page_path, page.html.as_bytes()).await {
            tracing::error!("Failed to save {}: {}", url, e);
            return PageOutcome::WriteFailed;
        }

        tracing::info!(
            "Saved {} ({} references rewritten)",
            url,
            page.rewritten
        );
        PageOutcome::Saved
    }

    /// Collects `url(...)` resources of a stylesheet as assets
    async fn scan_stylesheet(&self, stylesheet: &Url) {
        let Some(css) = self.fetcher.static_fetcher().fetch_text(stylesheet).await else {
            return;
        };
        self.stats.record_stylesheet_scanned();

        for target in scan_css_urls(&css, stylesheet, &self.base_url) {
            let path = local_path(&target, self.store.root(), ContentCategory::Assets);
            if self.assets.insert(target.clone(), path) {
                tracing::debug!("Found {} in {}", target, stylesheet);
            }
        }
    }

    /// Downloads one asset; returns true if it was written
    async fn download_asset(&self, task: AssetTask) -> bool {
        let body = match self.fetcher.static_fetcher().fetch(&task.url).await {
            FetchResult::Fetched { body, .. } => body,
            _ => return false,
        };

        match self.store.save(&task.path, &body).await {
            Ok(()) => {
                tracing::debug!("Downloaded {}", task.url);
                true
            }
            Err(e) => {
                tracing::error!("Failed to save asset {}: {}", task.url, e);
                self.stats.record_write_failure();
                false
            }
        }
    }
}

/// Main mirror coordinator structure
pub struct Coordinator {
    ctx: Arc<RunContext>,
    renderer: Arc<dyn Renderer>,
    pool: WorkerPool,
    run_id: String,
    archive_path: PathBuf,
    phase: RunPhase,
}

impl Coordinator {
    /// Creates a coordinator, launching the headless browser if enabled
    ///
    /// # Arguments
    ///
    /// * `config` - The mirror configuration
    /// * `base_url` - Start page; its origin bounds the crawl
    /// * `cancel` - Run-scoped cancellation token
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Run directory created, ready to run
    /// * `Err(MirrorError)` - Invalid input or setup failure
    pub async fn new(
        config: Config,
        base_url: &str,
        cancel: CancellationToken,
    ) -> Result<Self, MirrorError> {
        validate(&config)?;
        let base = normalize_url(base_url)?;
        let renderer = render::launch(&config.dynamic).await;
        Self::build(config, base, renderer, cancel)
    }

    /// Creates a coordinator with a caller-supplied renderer
    pub fn with_renderer(
        config: Config,
        base_url: &str,
        renderer: Arc<dyn Renderer>,
        cancel: CancellationToken,
    ) -> Result<Self, MirrorError> {
        validate(&config)?;
        let base = normalize_url(base_url)?;
        Self::build(config, base, renderer, cancel)
    }

    fn build(
        config: Config,
        base_url: Url,
        renderer: Arc<dyn Renderer>,
        cancel: CancellationToken,
    ) -> Result<Self, MirrorError> {
        let timestamp = chrono::Utc::now().timestamp();
        let (run_id, run_dir) =
            prepare_run_dir(&config.output.root, &run_id(&base_url, timestamp))?;

        let store = OutputStore::create(&run_dir).map_err(|e| match e {
            StorageError::Io { path, source } => MirrorError::Setup {
                path: path.display().to_string(),
                source,
            },
            other => MirrorError::Storage(other),
        })?;

        let archive_path = run_dir
            .parent()
            .unwrap_or(&config.output.root)
            .join(format!("{}_scraped.zip", site_label(&base_url)));

        let stats = Arc::new(RunStatistics::new());
        let static_fetcher = Arc::new(StaticFetcher::from_config(&config)?);
        let fetcher = ContentFetcher::new(
            static_fetcher,
            Arc::clone(&renderer),
            RenderOptions::from_config(&config.dynamic),
            config.dynamic.sparse_threshold,
            Arc::clone(&stats),
        );

        tracing::info!("Prepared run {} in {}", run_id, run_dir.display());

        Ok(Self {
            ctx: Arc::new(RunContext {
                base_url,
                max_depth: config.crawler.max_depth,
                store,
                fetcher,
                sets: CrawlSets::new(),
                assets: AssetSet::new(),
                scanned_stylesheets: ClaimSet::new(),
                stats,
            }),
            renderer,
            pool: WorkerPool::new(config.crawler.max_workers as usize, cancel),
            run_id,
            archive_path,
            phase: RunPhase::Pending,
        })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn output_dir(&self) -> &Path {
        self.ctx.store.root()
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Runs the whole pipeline: crawl, assets, archive
    pub async fn run(mut self) -> Result<MirrorOutcome, MirrorError> {
        let span = tracing::info_span!("run", id = %self.run_id);
        async move {
            tracing::info!("Mirroring {}", self.ctx.base_url);

            let crawled = self.crawl().await;
            if let Err(e) = self.renderer.shutdown().await {
                tracing::warn!("Failed to release headless browser: {:#}", e);
            }
            crawled?;

            self.download_assets().await?;
            let (archive_path, manifest) = self.package().await?;

            let stats = self.ctx.stats.snapshot();
            tracing::info!(
                "Run complete: {} pages, {} assets, {} files",
                stats.pages_saved,
                stats.assets_downloaded,
                manifest.len()
            );

            Ok(MirrorOutcome {
                run_id: self.run_id.clone(),
                output_dir: self.ctx.store.root().to_path_buf(),
                manifest,
                archive_path,
                stats,
            })
        }
        .instrument(span)
        .await
    }

    fn transition(&mut self, next: RunPhase) -> Result<(), MirrorError> {
        if !self.phase.can_transition_to(next) {
            return Err(MirrorError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        tracing::debug!("Phase {} -> {}", self.phase, next);
        self.phase = next;
        Ok(())
    }

    async fn crawl(&mut self) -> Result<(), MirrorError> {
        self.ctx.sets.enqueue(self.ctx.base_url.clone());

        for depth in 0..=self.ctx.max_depth {
            let pending = self.ctx.sets.drain_pending();
            if pending.is_empty() {
                tracing::info!("Frontier is empty at depth {}, crawl complete", depth);
                break;
            }

            self.transition(RunPhase::Crawling { depth })?;
            tracing::info!("Depth {}: {} pages pending", depth, pending.len());

            let ctx = Arc::clone(&self.ctx);
            let outcomes = self
                .pool
                .run_batch(pending, |url| {
                    let ctx = Arc::clone(&ctx);
                    async move { ctx.process_page(url, depth).await }
                })
                .await?;

            for outcome in outcomes {
                self.ctx.stats.record_page(outcome);
            }
            debug_assert!(self.ctx.sets.is_consistent());
            tracing::info!(
                "Depth {} done: {} visited, {} queued",
                depth,
                self.ctx.sets.visited_len(),
                self.ctx.sets.frontier_len()
            );
        }

        Ok(())
    }

    async fn download_assets(&mut self) -> Result<(), MirrorError> {
        self.transition(RunPhase::DownloadingAssets)?;

        let tasks = self.ctx.assets.tasks();
        tracing::info!("Downloading {} assets", tasks.len());

        let ctx = Arc::clone(&self.ctx);
        let results = self
            .pool
            .run_batch(tasks, |task| {
                let ctx = Arc::clone(&ctx);
                async move { ctx.download_asset(task).await }
            })
            .await?;

        for downloaded in results {
            self.ctx.stats.record_asset(downloaded);
        }
        Ok(())
    }

    async fn package(&mut self) -> Result<(PathBuf, FileManifest), MirrorError> {
        self.transition(RunPhase::Archiving)?;

        let run_dir = self.ctx.store.root().to_path_buf();
        let archive_path = self.archive_path.clone();
        let run_id = self.run_id.clone();

        let (archive_path, manifest) = tokio::task::spawn_blocking(move || {
            let archive_path = archive_directory(&run_dir, &archive_path)?;
            let manifest = build_manifest(&run_id, &run_dir)?;
            Ok::<_, MirrorError>((archive_path, manifest))
        })
        .await
        .map_err(|e| MirrorError::Task(e.to_string()))??;

        self.transition(RunPhase::Done)?;
        Ok((archive_path, manifest))
    }
}

/// Creates a fresh run directory under `output_root`
///
/// An existing directory is never reused: a `-1`, `-2`, ... suffix is added
/// until the name is free.
fn prepare_run_dir(output_root: &Path, base_id: &str) -> Result<(String, PathBuf), MirrorError> {
    std::fs::create_dir_all(output_root).map_err(|source| MirrorError::Setup {
        path: output_root.display().to_string(),
        source,
    })?;

    let mut run_id = base_id.to_string();
    let mut suffix = 0u32;
    loop {
        let dir = output_root.join(&run_id);
        match std::fs::create_dir(&dir) {
            Ok(()) => return Ok((run_id, dir)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                suffix += 1;
                run_id = format!("{}-{}", base_id, suffix);
            }
            Err(source) => {
                return Err(MirrorError::Setup {
                    path: dir.display().to_string(),
                    source,
                })
            }
        }
    }
}

/// Mirrors a site with the given configuration
///
/// # Example
///
/// ```no_run
/// use sumi_mirror::{mirror_site, Config};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let outcome = mirror_site(Config::default(), "https://example.com/", CancellationToken::new()).await?;
/// println!("Archive at {}", outcome.archive_path.display());
/// # Ok(())
/// # }
/// ```
pub async fn mirror_site(
    config: Config,
    base_url: &str,
    cancel: CancellationToken,
) -> Result<MirrorOutcome, MirrorError> {
    Coordinator::new(config, base_url, cancel).await?.run().await
}

/// Runs one complete scrape with explicit parameters
///
/// # Arguments
///
/// * `base_url` - Start page
/// * `depth` - Maximum link depth from the start page
/// * `workers` - Maximum concurrent page or asset tasks
/// * `output_root` - Directory that receives the run directory and archive
/// * `user_agent` - Full User-Agent header value; the default is used when `None`
///
/// # Returns
///
/// * `Ok((FileManifest, PathBuf))` - Manifest of the run directory and the archive path
/// * `Err(MirrorError)` - Setup failed or the run was cancelled
pub async fn run_scrape_workflow(
    base_url: &str,
    depth: u32,
    workers: u32,
    output_root: &Path,
    user_agent: Option<&str>,
) -> Result<(FileManifest, PathBuf), MirrorError> {
    let mut config = Config::default();
    config.crawler.max_depth = depth;
    config.crawler.max_workers = workers;
    config.output.root = output_root.to_path_buf();
    config.user_agent.override_value = user_agent.map(str::to_string);

    let outcome = mirror_site(config, base_url, CancellationToken::new()).await?;
    Ok((outcome.manifest, outcome.archive_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::NoopRenderer;
    use tempfile::TempDir;

    fn create_test_config(root: &Path) -> Config {
        let mut config = Config::default();
        config.output.root = root.to_path_buf();
        config.crawler.request_delay_ms = 0;
        config.dynamic.enabled = false;
        config
    }

    #[test]
    fn test_prepare_run_dir_adds_suffix() {
        let temp = TempDir::new().unwrap();

        let (first, first_dir) = prepare_run_dir(temp.path(), "example.com_1").unwrap();
        let (second, second_dir) = prepare_run_dir(temp.path(), "example.com_1").unwrap();

        assert_eq!(first, "example.com_1");
        assert_eq!(second, "example.com_1-1");
        assert!(first_dir.is_dir());
        assert!(second_dir.is_dir());
    }

    #[test]
    fn test_coordinator_creation() {
        let temp = TempDir::new().unwrap();
        let coordinator = Coordinator::with_renderer(
            create_test_config(temp.path()),
            "http://127.0.0.1:8080/",
            Arc::new(NoopRenderer),
            CancellationToken::new(),
        )
        .unwrap();

        assert!(coordinator.run_id().starts_with("127.0.0.1_8080_"));
        assert_eq!(coordinator.phase(), RunPhase::Pending);
        for category in ContentCategory::ALL {
            assert!(coordinator.output_dir().join(category.dir_name()).is_dir());
        }
        assert_eq!(
            coordinator.archive_path,
            temp.path().join("127.0.0.1_8080_scraped.zip")
        );
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let temp = TempDir::new().unwrap();
        let result = Coordinator::with_renderer(
            create_test_config(temp.path()),
            "ftp://example.com/",
            Arc::new(NoopRenderer),
            CancellationToken::new(),
        );
        assert!(matches!(result, Err(MirrorError::UrlError(_))));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let temp = TempDir::new().unwrap();
        let mut config = create_test_config(temp.path());
        config.crawler.max_workers = 0;

        let result = Coordinator::with_renderer(
            config,
            "https://example.com/",
            Arc::new(NoopRenderer),
            CancellationToken::new(),
        );
        assert!(matches!(result, Err(MirrorError::Config(_))));
    }

    #[test]
    fn test_transition_rejects_skipping_phases() {
        let temp = TempDir::new().unwrap();
        let mut coordinator = Coordinator::with_renderer(
            create_test_config(temp.path()),
            "https://example.com/",
            Arc::new(NoopRenderer),
            CancellationToken::new(),
        )
        .unwrap();

        assert!(matches!(
            coordinator.transition(RunPhase::Archiving),
            Err(MirrorError::InvalidTransition { .. })
        ));
        assert!(coordinator.transition(RunPhase::Crawling { depth: 0 }).is_ok());
    }

    #[test]
    fn test_setup_failure_is_reported() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let result = Coordinator::with_renderer(
            create_test_config(&blocker),
            "https://example.com/",
            Arc::new(NoopRenderer),
            CancellationToken::new(),
        );
        assert!(matches!(result, Err(MirrorError::Setup { .. })));
    }
}
