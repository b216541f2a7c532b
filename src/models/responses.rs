//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing JSON response bodies. Image bytes are
//! returned raw and have no DTO.

use serde::Serialize;

/// Response body for PUT /image/:key
#[derive(Debug, Clone, Serialize)]
pub struct StoreResponse {
    /// Success message
    pub message: String,
    /// The key that was stored
    pub key: String,
    /// Payload size in bytes
    pub bytes: usize,
}

impl StoreResponse {
    pub fn new(key: impl Into<String>, bytes: usize) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' stored in all tiers", key),
            key,
            bytes,
        }
    }
}

/// Response body for the clear endpoints (DELETE /cache, DELETE /cache/expired)
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub message: String,
}

impl ClearResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Response body for POST /lifecycle/:event
#[derive(Debug, Clone, Serialize)]
pub struct LifecycleResponse {
    /// The event that was delivered
    pub event: String,
    pub message: String,
}

impl LifecycleResponse {
    pub fn new(event: impl Into<String>) -> Self {
        let event = event.into();
        Self {
            message: format!("Lifecycle event '{}' delivered", event),
            event,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Active tiers, fastest first
    pub tiers: Vec<String>,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(tiers: Vec<String>) -> Self {
        Self {
            status: "healthy".to_string(),
            tiers,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
