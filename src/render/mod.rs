//! Dynamic rendering for client-rendered pages
//!
//! Defines the `Renderer` trait used by the fetcher's fallback path. The
//! concrete engine is headless Chromium (behind the `browser` feature); when
//! it is disabled or cannot be launched, a `NoopRenderer` is selected and the
//! run proceeds static-only.

#[cfg(feature = "browser")]
pub mod chromium;

use crate::config::DynamicConfig;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Timing bounds for one render
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    /// Upper bound on navigation plus waiting for `<body>`
    pub timeout: Duration,

    /// Fixed pause after `<body>` appears, for scripts to populate the page
    pub settle: Duration,
}

impl RenderOptions {
    pub fn from_config(config: &DynamicConfig) -> Self {
        Self {
            timeout: config.render_timeout(),
            settle: config.settle_delay(),
        }
    }
}

/// A browser engine that returns the rendered markup of a page
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Returns false when rendering will always fail
    fn is_available(&self) -> bool;

    /// Loads `url`, waits for the page to settle and returns its outer HTML
    async fn render(&self, url: &Url, options: RenderOptions) -> Result<String>;

    /// Releases the engine; later renders fail
    async fn shutdown(&self) -> Result<()>;
}

/// Renderer used when no browser is available
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRenderer;

#[async_trait]
impl Renderer for NoopRenderer {
    fn is_available(&self) -> bool {
        false
    }

    async fn render(&self, url: &Url, _options: RenderOptions) -> Result<String> {
        anyhow::bail!("dynamic rendering unavailable for {}", url)
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

/// Selects the renderer for a run
///
/// Launch failures are not fatal: they are logged and the run continues
/// with a [`NoopRenderer`].
pub async fn launch(config: &DynamicConfig) -> Arc<dyn Renderer> {
    if !config.enabled {
        tracing::info!("Dynamic rendering disabled; running static-only");
        return Arc::new(NoopRenderer);
    }

    #[cfg(feature = "browser")]
    {
        match chromium::ChromiumRenderer::launch(config.chrome_path.as_deref()).await {
            Ok(renderer) => {
                tracing::info!("Headless browser ready for dynamic fallback");
                return Arc::new(renderer);
            }
            Err(e) => {
                tracing::warn!("Headless browser unavailable, running static-only: {:#}", e);
            }
        }
    }

    #[cfg(not(feature = "browser"))]
    tracing::warn!("Built without the `browser` feature; running static-only");

    Arc::new(NoopRenderer)
}
