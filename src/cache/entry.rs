//! Cache Entry Module
//!
//! Defines the payload buffer and the per-tier entry with TTL support.

use std::time::{Duration, SystemTime};

use bytes::Bytes;

// == Payload ==
/// Immutable encoded image bytes. Clones share the underlying buffer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Payload(Bytes);

impl Payload {
    /// Wraps encoded bytes.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Size of the payload in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the payload holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrows the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the underlying buffer.
    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Bytes::from(bytes))
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

impl From<&'static [u8]> for Payload {
    fn from(bytes: &'static [u8]) -> Self {
        Self(Bytes::from_static(bytes))
    }
}

// == Entry ==
/// A single cached item as held by one tier.
#[derive(Debug, Clone)]
pub struct Entry {
    /// The stored payload
    pub payload: Payload,
    /// When this tier received its copy
    pub created_at: SystemTime,
    /// Time-to-live measured from `created_at`
    pub ttl: Duration,
    /// Payload size in bytes
    pub size_bytes: u64,
}

impl Entry {
    // == Constructor ==
    /// Creates an entry timestamped now.
    pub fn new(payload: Payload, ttl: Duration) -> Self {
        Self::created_at(payload, ttl, SystemTime::now())
    }

    /// Creates an entry with an explicit creation time, e.g. a file's mtime.
    pub fn created_at(payload: Payload, ttl: Duration, created_at: SystemTime) -> Self {
        let size_bytes = payload.len() as u64;
        Self {
            payload,
            created_at,
            ttl,
            size_bytes,
        }
    }

    // == Age ==
    /// Time elapsed since creation. A creation time in the future counts as zero.
    pub fn age(&self) -> Duration {
        SystemTime::now()
            .duration_since(self.created_at)
            .unwrap_or(Duration::ZERO)
    }

    // == Is Expired ==
    /// Checks if the entry has outlived its TTL.
    ///
    /// Boundary condition: an entry is expired only once its age is strictly
    /// greater than the TTL.
    pub fn is_expired(&self) -> bool {
        self.age() > self.ttl
    }

    // == Time To Live ==
    /// Remaining lifetime, zero once expired.
    pub fn ttl_remaining(&self) -> Duration {
        self.ttl.saturating_sub(self.age())
    }
}
