//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each endpoint over a memory and
//! disk tier chain.

use std::io::Cursor;
use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use image_tier_cache::{
    api::create_router,
    cache::{DiskTier, ImageCache, MemoryTier, Tier},
    AppState, Config,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

// == Helper Functions ==

fn create_test_app() -> (Router, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let memory: Arc<dyn Tier> = Arc::new(MemoryTier::new(1024 * 1024, 100));
    let disk: Arc<dyn Tier> =
        Arc::new(DiskTier::new(dir.path(), 1024 * 1024, Duration::from_secs(3600)).unwrap());
    let config = Config {
        default_ttl: Duration::from_secs(60),
        cache_dir: dir.path().to_path_buf(),
        ..Config::default()
    };
    let cache = ImageCache::with_tiers(vec![memory, disk], config);
    (create_router(AppState::new(Arc::new(cache))), dir)
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_to_bytes(body: Body) -> Vec<u8> {
    axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    image::DynamicImage::new_rgb8(width, height)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn put(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .body(body.into())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

// == Store / Load Endpoint Tests ==

#[tokio::test]
async fn test_store_endpoint_success() {
    let (app, _dir) = create_test_app();

    let response = app.oneshot(put("/image/avatar", "raw")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["key"], "avatar");
    assert_eq!(json["bytes"], 3);
    assert!(json["message"].as_str().unwrap().contains("avatar"));
}

#[tokio::test]
async fn test_load_key_returns_png_with_content_type() {
    let (app, _dir) = create_test_app();
    let png = png_bytes(3, 2);

    let response = app
        .clone()
        .oneshot(put("/image/logo?ttl=120", png.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/image/logo")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(body_to_bytes(response.into_body()).await, png);
}

#[tokio::test]
async fn test_load_key_not_found() {
    let (app, _dir) = create_test_app();

    let response = app.oneshot(get("/image/nonexistent")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("nonexistent"));
}

#[tokio::test]
async fn test_store_empty_body_rejected() {
    let (app, _dir) = create_test_app();

    let response = app.oneshot(put("/image/empty", Body::empty())).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_load_locator_rejects_unsupported_scheme() {
    let (app, _dir) = create_test_app();

    let response = app
        .oneshot(get("/image?url=ftp://example.com/a.png"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("scheme"));
}

#[tokio::test]
async fn test_load_locator_missing_url() {
    let (app, _dir) = create_test_app();

    let response = app.oneshot(get("/image")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_load_locator_with_explicit_key_hits_cache() {
    let (app, _dir) = create_test_app();

    app.clone()
        .oneshot(put("/image/hero", "cached-bytes"))
        .await
        .unwrap();

    // No origin tier is installed; the explicit key resolves from memory
    let response = app
        .oneshot(get("/image?url=https://example.com/hero.png&key=hero"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_bytes(response.into_body()).await, b"cached-bytes");
}

// == Clear Endpoint Tests ==

#[tokio::test]
async fn test_clear_endpoint_is_idempotent() {
    let (app, _dir) = create_test_app();

    app.clone().oneshot(put("/image/a", "aaa")).await.unwrap();

    for _ in 0..2 {
        let response = app.clone().oneshot(delete("/cache")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.oneshot(get("/image/a")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_clear_expired_endpoint() {
    let (app, _dir) = create_test_app();

    let response = app.oneshot(delete("/cache/expired")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert!(json.get("message").is_some());
}

// == Metrics and Size Endpoint Tests ==

#[tokio::test]
async fn test_metrics_endpoint_counts_hits_and_misses() {
    let (app, _dir) = create_test_app();

    app.clone().oneshot(put("/image/k", "value")).await.unwrap();
    app.clone().oneshot(get("/image/k")).await.unwrap();
    app.clone().oneshot(get("/image/missing")).await.unwrap();

    let response = app.clone().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["hits_per_tier"]["memory"], 1);
    assert_eq!(json["misses"], 1);
    assert_eq!(json["hit_rate"], 0.5);

    let response = app.clone().oneshot(delete("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/metrics")).await.unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["misses"], 0);
    assert_eq!(json["hit_rate"], 0.0);
}

#[tokio::test]
async fn test_size_endpoint() {
    let (app, _dir) = create_test_app();

    app.clone()
        .oneshot(put("/image/sized", vec![0u8; 9]))
        .await
        .unwrap();

    let response = app.oneshot(get("/size")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["memory_bytes"], 9);
    assert_eq!(json["disk_bytes"], 9);
}

// == Lifecycle Endpoint Tests ==

#[tokio::test]
async fn test_low_memory_falls_back_to_disk() {
    let (app, _dir) = create_test_app();

    app.clone()
        .oneshot(put("/image/durable", "on-disk"))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/lifecycle/low-memory")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["event"], "low-memory");

    let response = app.clone().oneshot(get("/image/durable")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_bytes(response.into_body()).await, b"on-disk");

    let response = app.oneshot(get("/metrics")).await.unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["hits_per_tier"]["disk"], 1);
}

// == Health Endpoint Tests ==

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _dir) = create_test_app();

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["tiers"], serde_json::json!(["memory", "disk"]));
    assert!(json.get("timestamp").is_some());
}

// == TTL Expiration Test ==

#[tokio::test]
async fn test_ttl_expiration_via_api() {
    let (app, _dir) = create_test_app();

    let response = app
        .clone()
        .oneshot(put("/image/short?ttl=1", "fleeting"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(get("/image/short?ttl=1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    sleep(Duration::from_millis(1500));

    let response = app.oneshot(get("/image/short?ttl=1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
