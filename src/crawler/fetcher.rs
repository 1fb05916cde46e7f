//! Content fetching with static/dynamic fallback
//!
//! This module handles all network reads for a run, including:
//! - Building the HTTP client with the configured user agent and timeout
//! - Pacing requests with a fixed minimum delay shared by all workers
//! - Classifying responses and network errors
//! - Falling back to a headless browser for failed or sparse pages

use crate::config::Config;
use crate::output::RunStatistics;
use crate::render::{RenderOptions, Renderer};
use reqwest::{header::CONTENT_TYPE, Client};
use scraper::{Html, Selector};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use url::Url;

/// Elements whose text never counts as visible
const HIDDEN_TEXT_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Result of a static fetch
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched the resource
    Fetched {
        /// Final URL after redirects
        final_url: Url,
        /// Content-Type header value, empty if absent
        content_type: String,
        /// Response body
        body: Vec<u8>,
    },

    /// Server answered with a non-2xx status
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// Network error (connection refused, timeout, etc.)
    NetworkError {
        /// Error description
        error: String,
    },
}

impl FetchResult {
    /// Returns the body of a successful fetch with a non-empty payload
    pub fn into_body(self) -> Option<(Vec<u8>, String)> {
        match self {
            Self::Fetched {
                body, content_type, ..
            } if !body.is_empty() => Some((body, content_type)),
            _ => None,
        }
    }
}

/// Returns true if a Content-Type header value denotes HTML
pub fn is_html_content_type(content_type: &str) -> bool {
    let lower = content_type.to_ascii_lowercase();
    lower.contains("text/html") || lower.contains("application/xhtml+xml")
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - Full User-Agent header value
/// * `timeout` - Upper bound on one request, including the body
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Enforces a minimum delay between consecutive requests of a run
#[derive(Debug)]
pub struct RequestPacer {
    delay: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RequestPacer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            next_slot: Mutex::new(None),
        }
    }

    /// Waits until this caller's request slot
    ///
    /// Slots are handed out in call order, `delay` apart; the lock is only
    /// held while reserving, not while sleeping.
    pub async fn wait(&self) {
        let slot = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next {
                Some(reserved) if reserved > now => reserved,
                _ => now,
            };
            *next = Some(slot + self.delay);
            slot
        };
        tokio::time::sleep_until(slot).await;
    }
}

/// Paced HTTP GET
#[derive(Debug)]
pub struct StaticFetcher {
    client: Client,
    pacer: RequestPacer,
}

impl StaticFetcher {
    pub fn new(client: Client, delay: Duration) -> Self {
        Self {
            client,
            pacer: RequestPacer::new(delay),
        }
    }

    /// Builds a fetcher from the run configuration
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let client = build_http_client(
            &config.user_agent.header_value(),
            config.crawler.request_timeout(),
        )?;
        Ok(Self::new(client, config.crawler.request_delay()))
    }

    /// Fetches a URL; failures are classified, never raised
    pub async fn fetch(&self, url: &Url) -> FetchResult {
        self.pacer.wait().await;

        let response = match self.client.get(url.as_str()).send().await {
            Ok(response) => response,
            Err(e) => {
                let error = if e.is_timeout() {
                    "Request timeout".to_string()
                } else if e.is_connect() {
                    format!("Connection failed: {}", e)
                } else {
                    e.to_string()
                };
                tracing::warn!("Fetch failed for {}: {}", url, error);
                return FetchResult::NetworkError { error };
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Fetch failed for {}: HTTP {}", url, status.as_u16());
            return FetchResult::HttpError {
                status_code: status.as_u16(),
            };
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        match response.bytes().await {
            Ok(body) => FetchResult::Fetched {
                final_url,
                content_type,
                body: body.to_vec(),
            },
            Err(e) => {
                tracing::warn!("Failed to read body of {}: {}", url, e);
                FetchResult::NetworkError {
                    error: e.to_string(),
                }
            }
        }
    }

    /// Fetches a URL as text, for stylesheet scanning
    pub async fn fetch_text(&self, url: &Url) -> Option<String> {
        self.fetch(url)
            .await
            .into_body()
            .map(|(body, _)| String::from_utf8_lossy(&body).into_owned())
    }
}

/// Number of visible text characters in a document's `<body>`
///
/// Text inside `script`, `style`, `noscript` and `template` is ignored.
/// Each text node is trimmed before counting.
pub fn visible_text_len(html: &str) -> usize {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("body") else {
        return 0;
    };
    let Some(body) = document.select(&selector).next() else {
        return 0;
    };

    body.descendants()
        .filter_map(|node| node.value().as_text().map(|text| (node, text)))
        .filter(|(node, _)| {
            !node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|el| HIDDEN_TEXT_TAGS.contains(&el.name()))
            })
        })
        .map(|(_, text)| text.trim().chars().count())
        .sum()
}

/// Usable content for a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageContent {
    /// HTML ready for extraction and rewriting
    Html {
        html: String,
        /// Where the markup was served from; relative references resolve against it
        final_url: Url,
        /// True when the markup came from the headless browser
        rendered: bool,
    },

    /// The resource is not HTML
    NotHtml { content_type: String },

    /// Neither strategy produced content
    Unavailable,
}

/// Static fetcher plus the dynamic fallback policy
pub struct ContentFetcher {
    static_fetcher: Arc<StaticFetcher>,
    renderer: Arc<dyn Renderer>,
    render_options: RenderOptions,
    sparse_threshold: usize,
    stats: Arc<RunStatistics>,
}

impl ContentFetcher {
    pub fn new(
        static_fetcher: Arc<StaticFetcher>,
        renderer: Arc<dyn Renderer>,
        render_options: RenderOptions,
        sparse_threshold: usize,
        stats: Arc<RunStatistics>,
    ) -> Self {
        Self {
            static_fetcher,
            renderer,
            render_options,
            sparse_threshold,
            stats,
        }
    }

    pub fn static_fetcher(&self) -> &StaticFetcher {
        &self.static_fetcher
    }

    /// Fetches a page, falling back to dynamic rendering at most once
    ///
    /// # Fallback Policy
    ///
    /// | Static result | Action |
    /// |---------------|--------|
    /// | Failed or empty | Render |
    /// | HTML, visible text below threshold | Render |
    /// | HTML, enough text | Use static |
    /// | Non-HTML | Skip, no render |
    ///
    /// A successful render supersedes the static result. A failed render
    /// keeps whatever usable static HTML there was.
    pub async fn fetch_page(&self, url: &Url) -> PageContent {
        let static_content = match self.static_fetcher.fetch(url).await {
            FetchResult::Fetched {
                final_url,
                content_type,
                body,
            } if !body.is_empty() => {
                if !is_html_content_type(&content_type) {
                    return PageContent::NotHtml { content_type };
                }
                if final_url != *url {
                    tracing::debug!("{} redirected to {}", url, final_url);
                }

                let html = String::from_utf8_lossy(&body).into_owned();
                let visible = visible_text_len(&html);
                tracing::debug!("Static fetch of {}: {} visible chars", url, visible);
                if visible >= self.sparse_threshold {
                    return PageContent::Html {
                        html,
                        final_url,
                        rendered: false,
                    };
                }
                tracing::info!(
                    "Sparse content at {} ({} < {} chars)",
                    url,
                    visible,
                    self.sparse_threshold
                );
                Some((html, final_url))
            }
            _ => None,
        };

        if self.renderer.is_available() {
            if let Some(html) = self.render(url).await {
                return PageContent::Html {
                    html,
                    final_url: url.clone(),
                    rendered: true,
                };
            }
        }

        match static_content {
            Some((html, final_url)) => PageContent::Html {
                html,
                final_url,
                rendered: false,
            },
            None => PageContent::Unavailable,
        }
    }

    async fn render(&self, url: &Url) -> Option<String> {
        tracing::info!("Rendering {} with headless browser", url);
        let result = self.renderer.render(url, self.render_options).await;
        self.stats.record_dynamic_attempt(result.is_ok());

        match result {
            Ok(html) if !html.trim().is_empty() => Some(html),
            Ok(_) => {
                tracing::warn!("Headless browser returned empty markup for {}", url);
                None
            }
            Err(e) => {
                tracing::warn!("Dynamic render failed for {}: {:#}", url, e);
                None
            }
        }
    }
}
