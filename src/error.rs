//! Error types for the image cache
//!
//! One closed taxonomy shared by the chain, the facade and the HTTP surface.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Terminal outcome of a failed cache operation.
///
/// Tier backends never return these across the tier contract as hard errors;
/// they travel inside [`crate::cache::Lookup::Failed`] as a diagnostic and
/// only surface once the whole chain has been walked.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Malformed locator, rejected before any I/O
    #[error("Invalid locator: {0}")]
    InvalidLocator(String),

    /// Origin fetch failed at the transport level
    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    /// Bytes were retrieved but could not be decoded
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Cooperative cancellation was observed
    #[error("Request cancelled")]
    Cancelled,

    /// Every tier was consulted without a hit
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unexpected internal failure
    #[error("Internal error: {0}")]
    Unknown(String),
}

impl CacheError {
    /// Returns true for failures that are safe to retry.
    ///
    /// Locator and cancellation errors are caused by the caller and will
    /// repeat until the caller changes its input.
    pub fn is_transient(&self) -> bool {
        !matches!(self, CacheError::InvalidLocator(_) | CacheError::Cancelled)
    }
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Unknown(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidLocator(_) => StatusCode::BAD_REQUEST,
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidPayload(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CacheError::TransferFailed(_) => StatusCode::BAD_GATEWAY,
            CacheError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the image cache.
pub type Result<T> = std::result::Result<T, CacheError>;
