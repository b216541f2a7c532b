//! API Routes
//!
//! Configures the Axum router with all cache server endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_expired_handler, clear_handler, health_handler, lifecycle_handler, load_handler,
    load_key_handler, metrics_handler, reset_metrics_handler, size_handler, store_handler,
    AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /image?url=&key=&ttl=` - Resolve a locator through every tier
/// - `GET /image/:key` - Key-only lookup
/// - `PUT /image/:key` - Store the request body in every tier
/// - `DELETE /cache` - Clear every tier
/// - `DELETE /cache/expired` - Sweep expired disk entries
/// - `GET /metrics`, `DELETE /metrics` - Read or reset metrics
/// - `GET /size` - Memory and disk usage
/// - `POST /lifecycle/:event` - Deliver a host lifecycle signal
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/image", get(load_handler))
        .route("/image/:key", get(load_key_handler).put(store_handler))
        .route("/cache", delete(clear_handler))
        .route("/cache/expired", delete(clear_expired_handler))
        .route("/metrics", get(metrics_handler).delete(reset_metrics_handler))
        .route("/size", get(size_handler))
        .route("/lifecycle/:event", post(lifecycle_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
