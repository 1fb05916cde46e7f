use crate::common::*;
use std::sync::Arc;
use sumi_mirror::render::NoopRenderer;
use sumi_mirror::{
    run_scrape_workflow, ContentCategory, Coordinator, MirrorError, MirrorOutcome,
};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn run_static(server: &MockServer, root: &std::path::Path, depth: u32) -> MirrorOutcome {
    Coordinator::with_renderer(
        create_test_config(root, depth),
        &server.uri(),
        Arc::new(NoopRenderer),
        CancellationToken::new(),
    )
    .expect("Failed to create coordinator")
    .run()
    .await
    .expect("Run failed")
}

fn relative_paths(outcome: &MirrorOutcome) -> Vec<String> {
    outcome
        .manifest
        .entries
        .iter()
        .map(|e| e.relative_path.clone())
        .collect()
}

#[tokio::test]
async fn test_end_to_end_two_pages_one_stylesheet_one_image() {
    let server = MockServer::start().await;
    let host = host_dir(&server.uri());

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><head><link rel="stylesheet" href="/static/site.css"></head>
            <body>
              <h1>Welcome home</h1>
              <a href="/about.html">About</a>
              <a href="https://elsewhere.example.org/">Elsewhere</a>
              <img src="/img/logo.png">
            </body></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/about.html"))
        .respond_with(html(
            r#"<html><head><link rel="stylesheet" href="static/site.css"></head>
            <body><p>About this site</p><a href="/">Home</a></body></html>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/static/site.css"))
        .respond_with(css("body { color: #333; }"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/img/logo.png"))
        .respond_with(png())
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let outcome = run_static(&server, temp.path(), 1).await;

    let expected = vec![
        format!("css/{}/static/site.css", host),
        format!("html/{}/about.html", host),
        format!("html/{}/index.html", host),
        format!("images/{}/img/logo.png", host),
    ];
    assert_eq!(relative_paths(&outcome), expected);
    assert_eq!(outcome.stats.pages_saved, 2);
    assert_eq!(outcome.stats.assets_downloaded, 2);

    // Archive sits next to the run directory and holds the same files
    assert_eq!(outcome.archive_path.parent(), Some(temp.path()));
    assert_eq!(
        outcome.archive_path.file_name().unwrap().to_string_lossy(),
        format!("{}_scraped.zip", host)
    );
    assert_eq!(archive_entries(&outcome.archive_path), expected);

    // Links were rewritten to local relative paths
    let index =
        std::fs::read_to_string(outcome.output_dir.join(format!("html/{}/index.html", host)))
            .unwrap();
    assert!(index.contains(r#"href="about.html""#));
    assert!(index.contains(&format!(r#"href="../../css/{}/static/site.css""#, host)));
    assert!(index.contains(&format!(r#"src="../../images/{}/img/logo.png""#, host)));
    assert!(index.contains(r#"href="https://elsewhere.example.org/""#));
}

#[tokio::test]
async fn test_shared_stylesheet_assets_downloaded_once() {
    let server = MockServer::start().await;
    let host = host_dir(&server.uri());

    let page = r#"<html><head><link rel="stylesheet" href="/static/site.css"></head>
        <body><p>Some page text</p><a href="/second">Second</a></body></html>"#;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(page))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/second"))
        .respond_with(html(page))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/static/site.css"))
        .respond_with(css(
            ".a { background: url('img/a.png'); }\n.b { background: url(img/b.png); }",
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/static/img/a.png"))
        .respond_with(png())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/static/img/b.png"))
        .respond_with(png())
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let outcome = run_static(&server, temp.path(), 1).await;

    let assets: Vec<_> = outcome
        .manifest
        .in_category(ContentCategory::Assets)
        .map(|e| e.relative_path.clone())
        .collect();
    assert_eq!(
        assets,
        vec![
            format!("assets/{}/static/img/a.png", host),
            format!("assets/{}/static/img/b.png", host),
        ]
    );
    assert_eq!(outcome.stats.stylesheets_scanned, 1);
}

#[tokio::test]
async fn test_dynamic_fallback_attempted_once_per_sparse_page() {
    let server = MockServer::start().await;
    let host = host_dir(&server.uri());

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body><div id="app"></div><a href="/rich">Go</a>
            <script>render()</script></body></html>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rich"))
        .respond_with(html(
            "<html><body><p>This page already has plenty of server-rendered text.</p></body></html>",
        ))
        .mount(&server)
        .await;

    let renderer = Arc::new(RecordingRenderer::new(
        r#"<html><body><p>Rendered by the browser</p><a href="/rich">Go</a></body></html>"#,
    ));
    let temp = TempDir::new().unwrap();
    let outcome = Coordinator::with_renderer(
        create_test_config(temp.path(), 1),
        &server.uri(),
        renderer.clone(),
        CancellationToken::new(),
    )
    .unwrap()
    .run()
    .await
    .unwrap();

    assert_eq!(renderer.rendered(), vec![format!("{}/", server.uri())]);
    assert_eq!(outcome.stats.dynamic_attempts, 1);
    assert_eq!(outcome.stats.dynamic_successes, 1);
    assert_eq!(outcome.stats.pages_saved, 2);

    let index =
        std::fs::read_to_string(outcome.output_dir.join(format!("html/{}/index.html", host)))
            .unwrap();
    assert!(index.contains("Rendered by the browser"));
}

#[tokio::test]
async fn test_failures_and_foreign_references_are_tolerated() {
    let server = MockServer::start().await;
    let host = host_dir(&server.uri());

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><head><script src="https://cdn.example.net/lib.js"></script></head>
            <body><p>Index</p>
              <img src="/missing.png">
              <a href="/gone">Gone</a>
              <a href="/report.pdf">Report</a>
            </body></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/missing.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/report.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/pdf")
                .set_body_bytes(b"%PDF-1.4".to_vec()),
        )
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let outcome = run_static(&server, temp.path(), 1).await;

    assert_eq!(
        relative_paths(&outcome),
        vec![format!("html/{}/index.html", host)]
    );
    assert_eq!(outcome.stats.pages_saved, 1);
    // Server error and non-HTML pages are skipped, not failed
    assert_eq!(outcome.stats.pages_skipped, 2);
    assert_eq!(outcome.stats.pages_failed, 0);
    assert_eq!(outcome.stats.assets_failed, 1);

    for entry in &outcome.manifest.entries {
        assert!(entry.category.is_some(), "{} outside partitions", entry.relative_path);
        assert!(!entry.relative_path.contains("cdn.example.net"));
    }
}

#[tokio::test]
async fn test_nested_extensionless_routes_are_both_saved() {
    let server = MockServer::start().await;
    let host = host_dir(&server.uri());

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><body><p>Company home page</p>
            <a href="/about">About</a><a href="/about/team">Team</a></body></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html("<html><body><p>About the company</p></body></html>"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/about/team"))
        .respond_with(html("<html><body><p>Meet the whole team</p></body></html>"))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let outcome = run_static(&server, temp.path(), 1).await;

    assert_eq!(
        relative_paths(&outcome),
        vec![
            format!("html/{}/about/index.html", host),
            format!("html/{}/about/team/index.html", host),
            format!("html/{}/index.html", host),
        ]
    );
    assert_eq!(outcome.stats.pages_saved, 3);
    assert_eq!(outcome.stats.write_failures, 0);

    let index =
        std::fs::read_to_string(outcome.output_dir.join(format!("html/{}/index.html", host)))
            .unwrap();
    assert!(index.contains(r#"href="about/index.html""#));
    assert!(index.contains(r#"href="about/team/index.html""#));
}

#[tokio::test]
async fn test_depth_zero_saves_only_start_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<html><body><a href="/next">Next</a></body></html>"#))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/next"))
        .respond_with(html("<html><body>next</body></html>"))
        .expect(0)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let outcome = run_static(&server, temp.path(), 0).await;
    assert_eq!(outcome.stats.pages_saved, 1);
    assert_eq!(outcome.manifest.len(), 1);
}

#[tokio::test]
async fn test_cancelled_run_reports_cancellation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(html("<html><body>never</body></html>"))
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let temp = TempDir::new().unwrap();
    let result = Coordinator::with_renderer(
        create_test_config(temp.path(), 1),
        &server.uri(),
        Arc::new(NoopRenderer),
        cancel,
    )
    .unwrap()
    .run()
    .await;

    assert!(matches!(result, Err(MirrorError::Cancelled)));
}

#[tokio::test]
async fn test_run_scrape_workflow_returns_manifest_and_archive() {
    let server = MockServer::start().await;
    let text = "Plenty of server-rendered prose. ".repeat(30);

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(&format!(
            r#"<html><body><p>{}</p><img src="/logo.png"></body></html>"#,
            text
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/logo.png"))
        .respond_with(png())
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let (manifest, archive) =
        run_scrape_workflow(&server.uri(), 1, 2, temp.path(), Some("TestBot/1.0"))
            .await
            .unwrap();

    assert_eq!(manifest.len(), 2);
    assert!(archive.is_file());
    for entry in &manifest.entries {
        assert!(manifest.root.join(&entry.relative_path).is_file());
        assert!(manifest.root.starts_with(temp.path()));
    }
}
