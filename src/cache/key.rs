//! Cache Key Module
//!
//! Opaque lookup keys and their on-disk content addresses.

use std::fmt;

use reqwest::Url;
use sha2::{Digest, Sha256};

// == Cache Key ==
/// Identifier of one logical resource across every tier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Creates a key from an explicit caller-supplied string.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Derives the key from the canonical string form of a locator.
    pub fn from_locator(locator: &Url) -> Self {
        Self(locator.as_str().to_string())
    }

    /// Returns the raw key string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    // == Content Address ==
    /// Lowercase hex SHA-256 digest of the key, used as the on-disk filename.
    pub fn content_address(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.0.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for CacheKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}
