//! API Module
//!
//! HTTP handlers and routing for the image cache REST API.
//!
//! # Endpoints
//! - `GET /image?url=` - Resolve a locator
//! - `GET /image/:key` - Key-only lookup
//! - `PUT /image/:key` - Store a payload
//! - `DELETE /cache` - Clear all tiers
//! - `DELETE /cache/expired` - Sweep expired entries
//! - `GET /metrics`, `DELETE /metrics` - Metrics snapshot and reset
//! - `GET /size` - Cache size
//! - `POST /lifecycle/:event` - Lifecycle signals
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
