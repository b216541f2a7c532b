//! Origin Tier Module
//!
//! Pull-through tier that fetches payloads from their locator. It never
//! persists anything; the chain promotes its hits into the faster tiers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;
use tracing::{debug, warn};

use crate::cache::{
    CacheKey, Entry, ImageCodec, Lookup, Medium, Payload, StandardCodec, Tier, TierRequest,
};
use crate::config::Config;
use crate::error::{CacheError, Result};

// == Transport ==
/// Network leg of the origin tier.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetches the body at `locator`, failing once it grows past `max_bytes`.
    async fn fetch(&self, locator: &Url, max_bytes: u64) -> Result<Bytes>;
}

/// HTTP(S) transport on a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CacheError::Unknown(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, locator: &Url, max_bytes: u64) -> Result<Bytes> {
        let mut response = self
            .client
            .get(locator.clone())
            .send()
            .await
            .map_err(|e| CacheError::TransferFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CacheError::TransferFailed(format!(
                "{} returned HTTP {}",
                locator, status
            )));
        }

        if response.content_length().is_some_and(|len| len > max_bytes) {
            return Err(CacheError::InvalidPayload(format!(
                "response exceeds {} bytes",
                max_bytes
            )));
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| CacheError::TransferFailed(e.to_string()))?
        {
            if (body.len() + chunk.len()) as u64 > max_bytes {
                return Err(CacheError::InvalidPayload(format!(
                    "response exceeds {} bytes",
                    max_bytes
                )));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(Bytes::from(body))
    }
}

// == Origin Tier ==
/// Fetch, validate and optionally downscale.
pub struct OriginTier {
    name: String,
    transport: Arc<dyn Transport>,
    codec: Arc<dyn ImageCodec>,
    max_dimension: Option<u32>,
    max_payload_bytes: u64,
}

impl OriginTier {
    pub fn new(transport: Arc<dyn Transport>, codec: Arc<dyn ImageCodec>) -> Self {
        Self {
            name: "origin".to_string(),
            transport,
            codec,
            max_dimension: None,
            max_payload_bytes: u64::MAX,
        }
    }

    /// Builds the HTTP origin tier described by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = HttpTransport::new(config.request_timeout)?;
        Ok(Self::new(Arc::new(transport), Arc::new(StandardCodec))
            .with_max_dimension(config.max_dimension)
            .with_max_payload_bytes(config.origin_memory_limit))
    }

    pub fn with_max_dimension(mut self, max_dimension: Option<u32>) -> Self {
        self.max_dimension = max_dimension;
        self
    }

    pub fn with_max_payload_bytes(mut self, max_payload_bytes: u64) -> Self {
        self.max_payload_bytes = max_payload_bytes;
        self
    }

    async fn fetch_payload(&self, locator: &Url) -> Result<Payload> {
        let bytes = self.transport.fetch(locator, self.max_payload_bytes).await?;

        // Decoding is CPU-bound; keep it off the async workers
        let codec = self.codec.clone();
        let max_dimension = self.max_dimension;
        tokio::task::spawn_blocking(move || process(codec.as_ref(), bytes, max_dimension))
            .await
            .map_err(|e| CacheError::Unknown(format!("decode task failed: {}", e)))?
    }
}

/// Validates `bytes` and downscales when the longer axis exceeds the limit.
fn process(codec: &dyn ImageCodec, bytes: Bytes, max_dimension: Option<u32>) -> Result<Payload> {
    let dims = codec.dimensions(&bytes)?;
    match max_dimension {
        Some(max) if dims.longer_axis() > max => Ok(Payload::from(codec.downscale(&bytes, max)?)),
        _ => Ok(Payload::from(bytes)),
    }
}

#[async_trait]
impl Tier for OriginTier {
    fn name(&self) -> &str {
        &self.name
    }

    fn medium(&self) -> Medium {
        Medium::Network
    }

    async fn load(&self, request: &TierRequest) -> Lookup {
        let Some(locator) = &request.locator else {
            return Lookup::Miss;
        };
        if request.cancel.is_cancelled() {
            return Lookup::Failed(CacheError::Cancelled);
        }

        // Dropping the fetch future aborts the underlying transfer
        let result = tokio::select! {
            biased;
            _ = request.cancel.cancelled() => Err(CacheError::Cancelled),
            result = self.fetch_payload(locator) => result,
        };

        match result {
            Ok(payload) => {
                debug!(key = %request.key, bytes = payload.len(), "Fetched from origin");
                Lookup::Hit(Entry::new(payload, request.ttl))
            }
            Err(CacheError::Cancelled) => {
                debug!(key = %request.key, "Origin fetch cancelled");
                Lookup::Failed(CacheError::Cancelled)
            }
            Err(e) => {
                warn!(key = %request.key, locator = %locator, error = %e, "Origin fetch failed");
                Lookup::Failed(e)
            }
        }
    }

    async fn store(&self, _payload: &Payload, _key: &CacheKey, _ttl: Duration) {}

    async fn clear(&self) {}
}
