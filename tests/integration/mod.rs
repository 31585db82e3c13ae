// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use clonrs::config::settings::{BrowserSettings, CloneSettings, ProxySettings};
use clonrs::domain::task::{CloneMode, CloneStatus};
use clonrs::events::CloneEvent;
use clonrs::workers::clone_worker::CloneWorker;
use std::collections::HashMap;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings_for(seed_url: &str, destination: &Path, mode: CloneMode) -> CloneSettings {
    CloneSettings {
        seed_url: seed_url.to_string(),
        destination_root: Some(destination.to_path_buf()),
        mode,
        headers: HashMap::new(),
        browser: BrowserSettings {
            enabled: false,
            page_load_timeout: 10,
        },
        request_delay: 0,
        proxy: ProxySettings::default(),
        max_depth: 5,
    }
}

async fn html_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_recursive_clone_produces_offline_browsable_tree() {
    let server = MockServer::start().await;
    html_page(
        &server,
        "/",
        r##"<html><head><link rel="stylesheet" href="/css/site.css"></head>
            <body>
                <a href="/about">About</a>
                <a href="javascript:void(0)">noop</a>
                <img src="/img/logo.png">
            </body></html>"##,
    )
    .await;
    html_page(
        &server,
        "/about",
        r#"<html><body><a href="/">Home</a></body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/css/site.css"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("body{margin:0}", "text/css"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/img/logo.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x89, b'P', b'N', b'G']))
        .mount(&server)
        .await;

    let dest = TempDir::new().unwrap();
    let settings = settings_for(&server.uri(), dest.path(), CloneMode::Recursive);
    let handle = CloneWorker::spawn(settings).unwrap();
    let report = handle.join.await.unwrap();

    assert_eq!(report.status, CloneStatus::Completed);
    assert_eq!(report.files_downloaded, 4);

    let index = std::fs::read_to_string(dest.path().join("index.html")).unwrap();
    assert!(index.starts_with("<!DOCTYPE html>"));
    assert!(index.contains(r#"href="about.html""#), "{}", index);
    assert!(index.contains(r#"href="css/site.css""#), "{}", index);
    assert!(index.contains(r#"src="img/logo.png""#), "{}", index);
    assert!(index.contains("javascript:void(0)"), "{}", index);

    let about = std::fs::read_to_string(dest.path().join("about.html")).unwrap();
    assert!(about.contains(r#"href="index.html""#), "{}", about);

    assert_eq!(
        std::fs::read_to_string(dest.path().join("css/site.css")).unwrap(),
        "body{margin:0}"
    );
    assert_eq!(
        std::fs::read(dest.path().join("img/logo.png")).unwrap(),
        vec![0x89, b'P', b'N', b'G']
    );
}

#[tokio::test]
async fn test_single_page_mode_stops_after_one_hop() {
    let server = MockServer::start().await;
    html_page(
        &server,
        "/",
        r#"<html><body><a href="/next">Next</a></body></html>"#,
    )
    .await;
    html_page(
        &server,
        "/next",
        r#"<html><body><a href="/deeper">Deeper</a></body></html>"#,
    )
    .await;
    html_page(&server, "/deeper", "<html><body>too far</body></html>").await;

    let dest = TempDir::new().unwrap();
    let settings = settings_for(&server.uri(), dest.path(), CloneMode::SinglePage);
    let handle = CloneWorker::spawn(settings).unwrap();
    let report = handle.join.await.unwrap();

    assert_eq!(report.status, CloneStatus::Completed);
    assert!(dest.path().join("index.html").is_file());
    assert!(dest.path().join("next.html").is_file());
    assert!(!dest.path().join("deeper.html").exists());
}

#[tokio::test]
async fn test_unreachable_seed_reports_failure() {
    let dest = TempDir::new().unwrap();
    // Port 9 (discard) refuses connections on loopback.
    let settings = settings_for("http://127.0.0.1:9/", dest.path(), CloneMode::Recursive);
    let handle = CloneWorker::spawn(settings).unwrap();
    let report = handle.join.await.unwrap();

    assert_eq!(report.status, CloneStatus::Failed);
    assert_eq!(report.files_downloaded, 0);
    assert!(!dest.path().join("index.html").exists());
}

#[tokio::test]
async fn test_invalid_seed_url_rejected_before_spawn() {
    let dest = TempDir::new().unwrap();
    let settings = settings_for("not a url", dest.path(), CloneMode::Recursive);
    assert!(CloneWorker::spawn(settings).is_err());
}

#[tokio::test]
async fn test_failed_asset_leaves_placeholder_reference() {
    let server = MockServer::start().await;
    html_page(
        &server,
        "/",
        r#"<html><body><img src="/gone.png"></body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/gone.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dest = TempDir::new().unwrap();
    let settings = settings_for(&server.uri(), dest.path(), CloneMode::Recursive);
    let handle = CloneWorker::spawn(settings).unwrap();
    let report = handle.join.await.unwrap();

    // The page itself is still saved; only the asset reference degrades.
    assert_eq!(report.status, CloneStatus::Completed);
    let index = std::fs::read_to_string(dest.path().join("index.html")).unwrap();
    assert!(index.contains("#FAILED_DOWNLOAD_/gone.png"), "{}", index);
}

#[tokio::test]
async fn test_event_stream_carries_page_content_and_final_report() {
    let server = MockServer::start().await;
    html_page(&server, "/", "<html><body>hello</body></html>").await;

    let dest = TempDir::new().unwrap();
    let settings = settings_for(&server.uri(), dest.path(), CloneMode::Recursive);
    let mut handle = CloneWorker::spawn(settings).unwrap();
    let report = handle.join.await.unwrap();
    assert_eq!(report.status, CloneStatus::Completed);

    let mut saw_processing_log = false;
    let mut saw_page_content = false;
    let mut saw_finished = false;
    while let Ok(event) = handle.events.try_recv() {
        match event {
            CloneEvent::Log { message, .. } => {
                if message.starts_with("Processing: ") && message.contains("(depth 0)") {
                    saw_processing_log = true;
                }
            }
            CloneEvent::PageContent { html, .. } => {
                assert!(html.contains("hello"));
                saw_page_content = true;
            }
            CloneEvent::Finished(finished) => {
                assert_eq!(finished.status, CloneStatus::Completed);
                saw_finished = true;
            }
            _ => {}
        }
    }
    assert!(saw_processing_log);
    assert!(saw_page_content);
    assert!(saw_finished);
}

#[tokio::test]
async fn test_rendered_engine_failure_falls_back_to_static() {
    let server = MockServer::start().await;
    html_page(&server, "/", "<html><body>rendered or not</body></html>").await;

    let dest = TempDir::new().unwrap();
    let mut settings = settings_for(&server.uri(), dest.path(), CloneMode::Recursive);
    settings.browser.enabled = true;
    settings.browser.page_load_timeout = 15;

    // With no usable browser binary the worker falls back to the static
    // engine for the seed; with one present the rendered path also saves
    // the page. Either way the run completes.
    let handle = CloneWorker::spawn(settings).unwrap();
    let report = handle.join.await.unwrap();

    assert_eq!(report.status, CloneStatus::Completed);
    assert!(dest.path().join("index.html").is_file());
}

#[tokio::test]
async fn test_cancellation_stops_the_traversal() {
    let server = MockServer::start().await;
    html_page(
        &server,
        "/",
        r#"<html><body><a href="/a">a</a><a href="/b">b</a></body></html>"#,
    )
    .await;
    html_page(&server, "/a", "<html><body>a</body></html>").await;
    html_page(&server, "/b", "<html><body>b</body></html>").await;

    let dest = TempDir::new().unwrap();
    let settings = settings_for(&server.uri(), dest.path(), CloneMode::Recursive);
    let handle = CloneWorker::spawn(settings).unwrap();
    handle.request_cancel();
    let report = handle.join.await.unwrap();

    // Depending on timing the seed may or may not have been processed,
    // but the run always ends with the user-stop status.
    assert_eq!(report.status, CloneStatus::Stopped);
}
