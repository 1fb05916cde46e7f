use async_trait::async_trait;
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use sumi_mirror::config::Config;
use sumi_mirror::render::{RenderOptions, Renderer};
use url::Url;
use wiremock::ResponseTemplate;

/// Creates a fast test configuration writing under `root`
pub fn create_test_config(root: &Path, max_depth: u32) -> Config {
    let mut config = Config::default();
    config.crawler.max_depth = max_depth;
    config.crawler.max_workers = 4;
    config.crawler.request_delay_ms = 0;
    config.crawler.request_timeout_secs = 5;
    config.user_agent.override_value = Some("TestBot/1.0".to_string());
    config.dynamic.sparse_threshold = 20;
    config.dynamic.settle_delay_ms = 0;
    config.output.root = root.to_path_buf();
    config
}

pub fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/html; charset=utf-8")
}

pub fn css(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/css")
}

pub fn png() -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "image/png")
        .set_body_bytes(vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a])
}

/// `127.0.0.1:PORT` as it appears in output paths
pub fn host_dir(server_uri: &str) -> String {
    let url = Url::parse(server_uri).unwrap();
    format!("{}_{}", url.host_str().unwrap(), url.port().unwrap())
}

/// Entry names of a zip archive, in archive order
pub fn archive_entries(path: &Path) -> Vec<String> {
    let mut zip = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    (0..zip.len())
        .map(|i| zip.by_index(i).unwrap().name().to_string())
        .collect()
}

/// Renderer that records every URL it is asked to render
pub struct RecordingRenderer {
    pub rendered: Mutex<Vec<String>>,
    markup: String,
}

impl RecordingRenderer {
    pub fn new(markup: &str) -> Self {
        Self {
            rendered: Mutex::new(Vec::new()),
            markup: markup.to_string(),
        }
    }

    pub fn rendered(&self) -> Vec<String> {
        self.rendered.lock().unwrap().clone()
    }
}

#[async_trait]
impl Renderer for RecordingRenderer {
    fn is_available(&self) -> bool {
        true
    }

    async fn render(&self, url: &Url, _options: RenderOptions) -> anyhow::Result<String> {
        self.rendered.lock().unwrap().push(url.to_string());
        Ok(self.markup.clone())
    }

    async fn shutdown(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
