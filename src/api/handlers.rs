//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};

use crate::cache::{
    CacheKey, CacheSize, ImageCache, ImageCodec, LifecycleEvent, LoadOptions, MetricsSnapshot,
    Payload, StandardCodec,
};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    validate_key, ClearResponse, HealthResponse, LifecycleResponse, LoadQuery, StoreResponse,
    TtlQuery,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The shared cache
    pub cache: Arc<ImageCache>,
}

impl AppState {
    pub fn new(cache: Arc<ImageCache>) -> Self {
        Self { cache }
    }

    /// Creates a new AppState with the standard tiers built from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let cache = ImageCache::new(config.clone())?;
        Ok(Self::new(Arc::new(cache)))
    }
}

/// Raw image body with a sniffed content type.
fn image_response(payload: Payload) -> Response {
    let mime = StandardCodec
        .mime_type(payload.as_bytes())
        .unwrap_or("application/octet-stream");
    ([(header::CONTENT_TYPE, mime)], payload.into_bytes()).into_response()
}

/// Handler for GET /image?url=&key=&ttl=
///
/// Resolves a locator through every tier.
pub async fn load_handler(
    State(state): State<AppState>,
    Query(query): Query<LoadQuery>,
) -> Result<Response> {
    if let Some(error_msg) = query.validate() {
        return Err(CacheError::InvalidLocator(error_msg));
    }

    let options = LoadOptions {
        key: query.key(),
        ttl: query.ttl(),
        cancel: None,
    };
    let payload = state.cache.load(&query.url, options).await?;

    Ok(image_response(payload))
}

/// Handler for GET /image/:key
///
/// Key-only lookup; the origin tier is never consulted.
pub async fn load_key_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<TtlQuery>,
) -> Result<Response> {
    if let Some(error_msg) = validate_key(&key) {
        return Err(CacheError::InvalidLocator(error_msg));
    }

    let payload = state
        .cache
        .load_key(CacheKey::new(key), query.ttl(), None)
        .await?;

    Ok(image_response(payload))
}

/// Handler for PUT /image/:key
///
/// Stores the raw request body in every tier.
pub async fn store_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<TtlQuery>,
    body: Bytes,
) -> Result<Json<StoreResponse>> {
    if let Some(error_msg) = validate_key(&key) {
        return Err(CacheError::InvalidLocator(error_msg));
    }
    if body.is_empty() {
        return Err(CacheError::InvalidPayload("Body cannot be empty".to_string()));
    }

    let bytes = body.len();
    state
        .cache
        .store(Payload::from(body), CacheKey::new(key.clone()), query.ttl())
        .await;

    Ok(Json(StoreResponse::new(key, bytes)))
}

/// Handler for DELETE /cache
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    state.cache.clear_all().await;
    Json(ClearResponse::new("All tiers cleared"))
}

/// Handler for DELETE /cache/expired
pub async fn clear_expired_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    state.cache.clear_expired().await;
    Json(ClearResponse::new("Expired entries cleared"))
}

/// Handler for GET /metrics
pub async fn metrics_handler(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.cache.metrics())
}

/// Handler for DELETE /metrics
pub async fn reset_metrics_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    state.cache.reset_metrics();
    Json(ClearResponse::new("Metrics reset"))
}

/// Handler for GET /size
pub async fn size_handler(State(state): State<AppState>) -> Json<CacheSize> {
    Json(state.cache.cache_size().await)
}

/// Handler for POST /lifecycle/:event
///
/// Accepts `low-memory`, `background` and `foreground`.
pub async fn lifecycle_handler(
    State(state): State<AppState>,
    Path(event): Path<String>,
) -> Result<Json<LifecycleResponse>> {
    let event: LifecycleEvent = event.parse()?;
    state.cache.handle_event(event).await;
    Ok(Json(LifecycleResponse::new(event.to_string())))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.cache.chain().tier_names()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryTier;
    use std::time::Duration;

    fn state() -> AppState {
        let memory = Arc::new(MemoryTier::new(1024, 10));
        let cache = ImageCache::with_tiers(
            vec![memory],
            Config {
                default_ttl: Duration::from_secs(60),
                ..Config::default()
            },
        );
        AppState::new(Arc::new(cache))
    }

    #[tokio::test]
    async fn test_store_and_load_key_handler() {
        let state = state();

        let result = store_handler(
            State(state.clone()),
            Path("avatar".to_string()),
            Query(TtlQuery::default()),
            Bytes::from_static(b"raw-bytes"),
        )
        .await;
        assert_eq!(result.unwrap().bytes, 9);

        let response = load_key_handler(
            State(state.clone()),
            Path("avatar".to_string()),
            Query(TtlQuery::default()),
        )
        .await
        .unwrap();
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn test_load_key_not_found() {
        let result = load_key_handler(
            State(state()),
            Path("missing".to_string()),
            Query(TtlQuery::default()),
        )
        .await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_store_empty_body_rejected() {
        let result = store_handler(
            State(state()),
            Path("k".to_string()),
            Query(TtlQuery::default()),
            Bytes::new(),
        )
        .await;
        assert!(matches!(result, Err(CacheError::InvalidPayload(_))));
    }

    #[tokio::test]
    async fn test_load_handler_rejects_bad_locator() {
        let query = LoadQuery {
            url: "not a url".to_string(),
            key: None,
            ttl: None,
        };
        let result = load_handler(State(state()), Query(query)).await;
        assert!(matches!(result, Err(CacheError::InvalidLocator(_))));
    }

    #[tokio::test]
    async fn test_lifecycle_handler() {
        let state = state();
        let response = lifecycle_handler(State(state.clone()), Path("low-memory".to_string()))
            .await
            .unwrap();
        assert_eq!(response.event, "low-memory");

        let result = lifecycle_handler(State(state), Path("nap".to_string())).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_health_lists_tiers() {
        let response = health_handler(State(state())).await;
        assert_eq!(response.status, "healthy");
        assert_eq!(response.tiers, vec!["memory".to_string()]);
    }
}
