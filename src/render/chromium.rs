//! Chromium-based renderer using chromiumoxide.

use super::{RenderOptions, Renderer};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use url::Url;

/// Environment variable pointing at a Chrome/Chromium binary
pub const CHROME_PATH_ENV: &str = "SUMI_CHROME_PATH";

/// Upper bound on closing a tab after a render
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs one browser step, failing once `deadline` has passed
async fn within<T, E>(
    deadline: Instant,
    step: &str,
    fut: impl Future<Output = std::result::Result<T, E>>,
) -> Result<T>
where
    E: std::error::Error + Send + Sync + 'static,
{
    match tokio::time::timeout_at(deadline, fut).await {
        Ok(result) => result.with_context(|| format!("failed {step}")),
        Err(_) => bail!("timed out {step}"),
    }
}

/// Find the Chromium binary path.
///
/// Order: explicit configuration, [`CHROME_PATH_ENV`], then the system PATH.
pub fn find_chromium(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Some(path.to_path_buf());
        }
        tracing::warn!("Configured chrome-path {} does not exist", path.display());
    }

    if let Ok(p) = std::env::var(CHROME_PATH_ENV) {
        let path = PathBuf::from(p);
        if path.exists() {
            return Some(path);
        }
    }

    ["google-chrome", "chromium", "chromium-browser"]
        .into_iter()
        .find_map(|name| which::which(name).ok())
}

/// Headless Chromium shared by every worker of a run
///
/// Renders are serialized: one tab is open at a time.
pub struct ChromiumRenderer {
    browser: Mutex<Option<Browser>>,
    handler: JoinHandle<()>,
}

impl ChromiumRenderer {
    /// Launches a headless Chromium instance
    pub async fn launch(configured: Option<&Path>) -> Result<Self> {
        let chrome_path = find_chromium(configured).context("Chromium not found")?;

        let config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .build()
            .map_err(|e| anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            handler,
        })
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    fn is_available(&self) -> bool {
        !self.handler.is_finished()
    }

    async fn render(&self, url: &Url, options: RenderOptions) -> Result<String> {
        // Every holder releases the lock within one render deadline plus CLOSE_TIMEOUT
        let guard = self.browser.lock().await;
        let Some(browser) = guard.as_ref() else {
            bail!("browser already shut down");
        };

        let deadline = Instant::now() + options.timeout + options.settle;
        let page = within(deadline, "opening a tab", browser.new_page("about:blank")).await?;

        let html = async {
            within(deadline, "waiting for <body>", async {
                page.goto(url.as_str()).await?;
                page.wait_for_navigation().await?;
                page.find_element("body").await
            })
            .await?;

            tokio::time::sleep_until(deadline.min(Instant::now() + options.settle)).await;

            within(
                deadline,
                "reading the rendered markup",
                page.evaluate("document.documentElement.outerHTML"),
            )
            .await?
            .into_value::<String>()
            .map_err(|e| anyhow!("failed to convert HTML result: {e:?}"))
        }
        .await;

        match tokio::time::timeout(CLOSE_TIMEOUT, page.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!("Failed to close tab for {}: {}", url, e),
            Err(_) => tracing::warn!("Timed out closing tab for {}", url),
        }
        html
    }

    async fn shutdown(&self) -> Result<()> {
        let Some(mut browser) = self.browser.lock().await.take() else {
            return Ok(());
        };

        if let Err(e) = browser.close().await {
            tracing::debug!("Browser close returned an error: {}", e);
        }
        let _ = browser.wait().await;
        self.handler.abort();
        tracing::info!("Headless browser shut down");
        Ok(())
    }
}
