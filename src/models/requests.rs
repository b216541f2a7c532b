//! Request DTOs for the cache server API
//!
//! Query strings accepted by the image endpoints.

use std::time::Duration;

use serde::Deserialize;

use crate::cache::CacheKey;

/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 2048;

/// Query for the locator lookup (GET /image)
///
/// # Fields
/// - `url`: Origin locator of the image
/// - `key`: Optional explicit cache key
/// - `ttl`: Optional TTL in seconds (uses default if not specified)
#[derive(Debug, Clone, Deserialize)]
pub struct LoadQuery {
    pub url: String,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl LoadQuery {
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl.map(Duration::from_secs)
    }

    pub fn key(&self) -> Option<CacheKey> {
        self.key.clone().map(CacheKey::from)
    }

    /// Validates the query
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.url.is_empty() {
            return Some("url cannot be empty".to_string());
        }
        validate_key(self.key.as_deref().unwrap_or("x"))
    }
}

/// Query for key lookups and stores (GET/PUT /image/:key)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TtlQuery {
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl TtlQuery {
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl.map(Duration::from_secs)
    }
}

/// Checks a path or query key.
pub fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    if key.len() > MAX_KEY_LENGTH {
        return Some(format!(
            "Key exceeds maximum length of {} characters",
            MAX_KEY_LENGTH
        ));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_query_deserialize() {
        let query: LoadQuery =
            serde_json::from_str(r#"{"url": "https://example.com/a.png"}"#).unwrap();
        assert_eq!(query.url, "https://example.com/a.png");
        assert!(query.key().is_none());
        assert!(query.ttl().is_none());
        assert!(query.validate().is_none());
    }

    #[test]
    fn test_load_query_with_key_and_ttl() {
        let query: LoadQuery =
            serde_json::from_str(r#"{"url": "https://e.com/a", "key": "avatar", "ttl": 60}"#)
                .unwrap();
        assert_eq!(query.key(), Some(CacheKey::new("avatar")));
        assert_eq!(query.ttl(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_validate_rejects_empty_values() {
        let query = LoadQuery {
            url: String::new(),
            key: None,
            ttl: None,
        };
        assert!(query.validate().is_some());

        let query = LoadQuery {
            url: "https://e.com/a".to_string(),
            key: Some(String::new()),
            ttl: None,
        };
        assert!(query.validate().is_some());
    }

    #[test]
    fn test_validate_key_length() {
        assert!(validate_key("ok").is_none());
        assert!(validate_key(&"x".repeat(MAX_KEY_LENGTH + 1)).is_some());
    }
}
