//! Tier contract shared by every backend in the chain.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::Serialize;

use crate::cache::{CacheKey, Entry, Payload};
use crate::cancel::CancellationHandle;
use crate::error::CacheError;

/// Storage medium of a tier, used to aggregate size queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Medium {
    Memory,
    Disk,
    Network,
}

/// Host environment signals delivered into the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleEvent {
    /// Memory pressure: drop in-memory content
    LowMemory,
    /// Process moved to the background: shrink budgets, sweep expired files
    EnterBackground,
    /// Process resumed: restore budgets
    EnterForeground,
}

impl FromStr for LifecycleEvent {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low-memory" => Ok(LifecycleEvent::LowMemory),
            "background" => Ok(LifecycleEvent::EnterBackground),
            "foreground" => Ok(LifecycleEvent::EnterForeground),
            other => Err(CacheError::InvalidLocator(format!(
                "unknown lifecycle event '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleEvent::LowMemory => write!(f, "low-memory"),
            LifecycleEvent::EnterBackground => write!(f, "background"),
            LifecycleEvent::EnterForeground => write!(f, "foreground"),
        }
    }
}

/// Arguments of a single tier lookup.
#[derive(Debug, Clone)]
pub struct TierRequest {
    /// Key shared by every tier
    pub key: CacheKey,
    /// Origin locator, None for key-only lookups
    pub locator: Option<Url>,
    /// Freshness bound for this lookup
    pub ttl: Duration,
    /// Caller's cancellation handle
    pub cancel: CancellationHandle,
}

impl TierRequest {
    pub fn new(key: CacheKey, ttl: Duration) -> Self {
        Self {
            key,
            locator: None,
            ttl,
            cancel: CancellationHandle::new(),
        }
    }

    pub fn with_locator(mut self, locator: Url) -> Self {
        self.locator = Some(locator);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationHandle) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Result of one tier lookup.
///
/// `Failed` is still a miss as far as the walk is concerned; it only carries
/// the reason so the chain can report the most specific terminal error.
#[derive(Debug, Clone)]
pub enum Lookup {
    Hit(Entry),
    Miss,
    Failed(CacheError),
}

impl Lookup {
    pub fn is_hit(&self) -> bool {
        matches!(self, Lookup::Hit(_))
    }
}

/// A backend in the tier chain.
///
/// Implementations absorb their own failures: `load` degrades to a miss and
/// `store`/`clear` log and return. All methods may be called concurrently for
/// the same or different keys.
#[async_trait]
pub trait Tier: Send + Sync {
    /// Name used in logs and metrics.
    fn name(&self) -> &str;

    fn medium(&self) -> Medium;

    async fn load(&self, request: &TierRequest) -> Lookup;

    async fn store(&self, payload: &Payload, key: &CacheKey, ttl: Duration);

    async fn clear(&self);

    /// Removes entries past the tier's own maximum age.
    async fn clear_expired(&self) {}

    /// Bytes currently held by the tier.
    async fn size_bytes(&self) -> u64 {
        0
    }

    async fn handle_event(&self, _event: LifecycleEvent) {}
}
