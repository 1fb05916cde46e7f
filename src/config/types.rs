use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Sumi-Mirror
///
/// Every section is optional in the TOML file; missing keys fall back to the
/// defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub dynamic: DynamicConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum link depth to follow from the base URL
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Width of the worker pool for pages and assets
    #[serde(rename = "max-workers")]
    pub max_workers: u32,

    /// Minimum time between two outgoing requests (milliseconds)
    #[serde(rename = "request-delay-ms")]
    pub request_delay_ms: u64,

    /// Hard timeout for a single static request (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 1,
            max_workers: 10,
            request_delay_ms: 100,
            request_timeout_secs: 20,
        }
    }
}

impl CrawlerConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// Free-form comment placed in parentheses
    pub comment: Option<String>,

    /// Complete header value; replaces the formatted one when set
    #[serde(rename = "override")]
    pub override_value: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "MirrorBot".to_string(),
            crawler_version: "2.0".to_string(),
            comment: Some("AdvancedConverter".to_string()),
            override_value: None,
        }
    }
}

impl UserAgentConfig {
    /// Returns the `User-Agent` header value
    ///
    /// Format: `CrawlerName/Version (Comment)`, unless an override is set.
    pub fn header_value(&self) -> String {
        if let Some(value) = &self.override_value {
            return value.clone();
        }

        match &self.comment {
            Some(comment) if !comment.is_empty() => {
                format!("{}/{} ({})", self.crawler_name, self.crawler_version, comment)
            }
            _ => format!("{}/{}", self.crawler_name, self.crawler_version),
        }
    }
}

/// Dynamic (headless browser) fallback configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DynamicConfig {
    /// Whether to attempt launching a browser at all
    pub enabled: bool,

    /// Hard timeout for loading a page until `<body>` is present (seconds)
    #[serde(rename = "render-timeout-secs")]
    pub render_timeout_secs: u64,

    /// Pause after load to let client-side rendering finish (milliseconds)
    #[serde(rename = "settle-delay-ms")]
    pub settle_delay_ms: u64,

    /// Visible text length below which a static page counts as sparse
    #[serde(rename = "sparse-threshold")]
    pub sparse_threshold: usize,

    /// Explicit Chromium executable; searched on PATH when absent
    #[serde(rename = "chrome-path")]
    pub chrome_path: Option<PathBuf>,
}

impl Default for DynamicConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            render_timeout_secs: 30,
            settle_delay_ms: 3000,
            sparse_threshold: 500,
            chrome_path: None,
        }
    }
}

impl DynamicConfig {
    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory that receives one sub-directory and one archive per run
    pub root: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("mirror_upgraded"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_user_agent() {
        let config = UserAgentConfig::default();
        assert_eq!(config.header_value(), "MirrorBot/2.0 (AdvancedConverter)");
    }

    #[test]
    fn test_user_agent_without_comment() {
        let config = UserAgentConfig {
            comment: None,
            ..UserAgentConfig::default()
        };
        assert_eq!(config.header_value(), "MirrorBot/2.0");
    }

    #[test]
    fn test_user_agent_override() {
        let config = UserAgentConfig {
            override_value: Some("Custom/9".to_string()),
            ..UserAgentConfig::default()
        };
        assert_eq!(config.header_value(), "Custom/9");
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.crawler.max_depth, 1);
        assert_eq!(config.crawler.max_workers, 10);
        assert_eq!(config.dynamic.sparse_threshold, 500);
        assert_eq!(config.output.root, PathBuf::from("mirror_upgraded"));
    }
}
