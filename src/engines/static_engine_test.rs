// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::static_engine::{StaticEngine, STATIC_REQUEST_TIMEOUT};
use crate::engines::traits::{EngineError, FetchEngine, FetchRequest};
use std::collections::HashMap;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request_for(url: String) -> FetchRequest {
    FetchRequest {
        url,
        headers: HashMap::new(),
        timeout: Duration::from_secs(10),
        proxy: None,
    }
}

#[tokio::test]
async fn test_static_engine_returns_bytes_and_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<html><body>ok</body></html>", "text/html; charset=utf-8"),
        )
        .mount(&server)
        .await;

    let engine = StaticEngine;
    let doc = engine
        .fetch(&request_for(format!("{}/page", server.uri())))
        .await
        .unwrap();

    assert_eq!(doc.raw_bytes, b"<html><body>ok</body></html>");
    assert_eq!(doc.declared_encoding.as_deref(), Some("utf-8"));
    assert!(doc.content_type.unwrap().contains("text/html"));
}

#[tokio::test]
async fn test_static_engine_non_2xx_is_failure_signal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let engine = StaticEngine;
    let err = engine
        .fetch(&request_for(format!("{}/missing", server.uri())))
        .await
        .unwrap_err();

    match err {
        EngineError::BadStatus(code) => assert_eq!(code, 404),
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_static_engine_sends_configured_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ua"))
        .and(header("user-agent", "clonrs-test/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("ok", "text/plain"))
        .mount(&server)
        .await;

    let mut request = request_for(format!("{}/ua", server.uri()));
    request
        .headers
        .insert("User-Agent".to_string(), "clonrs-test/1.0".to_string());

    let engine = StaticEngine;
    let doc = engine.fetch(&request).await.unwrap();
    assert_eq!(doc.raw_bytes, b"ok");
}

#[test]
fn test_static_request_timeout_is_independent_of_browser_timeout() {
    assert_eq!(STATIC_REQUEST_TIMEOUT, Duration::from_secs(20));
}

#[tokio::test]
async fn test_static_engine_transport_error() {
    // Nothing listens on this port
    let engine = StaticEngine;
    let err = engine
        .fetch(&request_for("http://127.0.0.1:9/".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::RequestFailed(_)));
}
