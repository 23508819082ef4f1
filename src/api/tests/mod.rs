use super::*;
use crate::downloader::test_helpers::{self, ScriptedEngine};
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use std::time::Duration;
use tower::ServiceExt;


/// Helper to create a test MediaDownloader instance wrapped in Arc
async fn create_test_downloader(
    engine: ScriptedEngine,
) -> (Arc<MediaDownloader>, tempfile::TempDir) {
    let (downloader, temp_dir) = test_helpers::create_test_downloader(Arc::new(engine)).await;
    (Arc::new(downloader), temp_dir)
}

/// Router over a downloader backed by `engine`
async fn test_app(engine: ScriptedEngine) -> (Router, Arc<MediaDownloader>, tempfile::TempDir) {
    let (downloader, temp_dir) = create_test_downloader(engine).await;
    let config = downloader.get_config();
    (create_router(downloader.clone(), config), downloader, temp_dir)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_api_server_spawns() {
    let (downloader, _temp_dir) = create_test_downloader(ScriptedEngine::new()).await;

    let mut config = (*downloader.get_config()).clone();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap(); // Port 0 = OS assigns a free port
    let config = Arc::new(config);

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let api_handle = tokio::spawn({
        let downloader = downloader.clone();
        async move {
            serve(downloader, config, async {
                let _ = rx.await;
            })
            .await
        }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    tx.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), api_handle)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok(), "server should stop cleanly: {:?}", result);
}

#[tokio::test]
async fn test_cors_exposes_content_disposition() {
    let (downloader, _temp_dir) = create_test_downloader(ScriptedEngine::new()).await;

    let mut config = (*downloader.get_config()).clone();
    config.server.api.cors_enabled = true;
    config.server.api.cors_origins = vec!["*".to_string()];
    let app = create_router(downloader, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert!(headers.contains_key("access-control-allow-origin"));
    let exposed = headers
        .get("access-control-expose-headers")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();
    assert!(
        exposed.contains("content-disposition"),
        "exposed headers: {}",
        exposed
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let (downloader, _temp_dir) = create_test_downloader(ScriptedEngine::new()).await;

    let mut config = (*downloader.get_config()).clone();
    config.server.api.cors_enabled = false;
    let app = create_router(downloader, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response.headers().contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn test_cors_specific_origin() {
    let (downloader, _temp_dir) = create_test_downloader(ScriptedEngine::new()).await;

    let mut config = (*downloader.get_config()).clone();
    config.server.api.cors_origins = vec!["http://allowed.test".to_string()];
    let app = create_router(downloader, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://allowed.test")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("http://allowed.test")
    );
}
