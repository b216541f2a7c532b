//! Tier Chain Module
//!
//! Walks tiers fastest first, promotes hits into the tiers that missed, and
//! fans writes and clears out to every tier.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info};

use crate::cache::{CacheKey, Entry, LifecycleEvent, Lookup, Medium, Payload, Tier, TierRequest};
use crate::config::Config;
use crate::error::{CacheError, Result};

/// Tier list and configuration, replaced together.
pub struct ChainState {
    pub tiers: Vec<Arc<dyn Tier>>,
    pub config: Arc<Config>,
}

/// A successful chain lookup.
#[derive(Debug, Clone)]
pub struct ChainHit {
    pub entry: Entry,
    /// Position of the satisfying tier in the chain
    pub tier_index: usize,
    pub tier: String,
}

/// Bytes held per storage medium.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheSize {
    pub memory_bytes: u64,
    pub disk_bytes: u64,
}

// == Tier Chain ==
/// Ordered tiers behind a copy-on-write slot.
///
/// Starts unconfigured. Every operation clones the current `Arc<ChainState>`
/// once, so a concurrent `install` or `set_tiers` is observed either fully or
/// not at all.
#[derive(Default)]
pub struct TierChain {
    state: RwLock<Option<Arc<ChainState>>>,
}

impl TierChain {
    /// Creates an unconfigured chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically replaces both the tiers and the configuration.
    pub fn install(&self, tiers: Vec<Arc<dyn Tier>>, config: Config) {
        let names: Vec<&str> = tiers.iter().map(|t| t.name()).collect();
        info!(tiers = ?names, "Installing tier chain");
        let state = Arc::new(ChainState {
            tiers,
            config: Arc::new(config),
        });
        *self.state.write() = Some(state);
    }

    /// Replaces the tiers, keeping the active configuration.
    pub fn set_tiers(&self, tiers: Vec<Arc<dyn Tier>>) {
        let config = self
            .config()
            .map(|c| c.as_ref().clone())
            .unwrap_or_default();
        self.install(tiers, config);
    }

    pub fn is_configured(&self) -> bool {
        self.state.read().is_some()
    }

    /// Current state, or None while unconfigured.
    pub fn state(&self) -> Option<Arc<ChainState>> {
        self.state.read().clone()
    }

    pub fn config(&self) -> Option<Arc<Config>> {
        self.state().map(|s| s.config.clone())
    }

    pub fn tier_names(&self) -> Vec<String> {
        self.state()
            .map(|s| s.tiers.iter().map(|t| t.name().to_string()).collect())
            .unwrap_or_default()
    }

    // == Load ==
    /// Consults tiers in order and promotes the first hit into every faster tier.
    ///
    /// Promotion completes before this returns. If the handle is cancelled the
    /// result is `Cancelled`, but promotions that already ran are kept.
    pub async fn load(&self, request: &TierRequest) -> Result<ChainHit> {
        let Some(state) = self.state() else {
            return Err(CacheError::NotFound(request.key.to_string()));
        };

        let mut last_failure = None;
        for (index, tier) in state.tiers.iter().enumerate() {
            if request.cancel.is_cancelled() {
                return Err(CacheError::Cancelled);
            }

            match tier.load(request).await {
                Lookup::Hit(entry) => {
                    debug!(key = %request.key, tier = tier.name(), "Tier hit");
                    for faster in &state.tiers[..index] {
                        faster.store(&entry.payload, &request.key, request.ttl).await;
                        debug!(key = %request.key, tier = faster.name(), "Promoted");
                    }
                    if request.cancel.is_cancelled() {
                        return Err(CacheError::Cancelled);
                    }
                    return Ok(ChainHit {
                        entry,
                        tier_index: index,
                        tier: tier.name().to_string(),
                    });
                }
                Lookup::Miss => {
                    debug!(key = %request.key, tier = tier.name(), "Tier miss");
                    last_failure = None;
                }
                Lookup::Failed(CacheError::Cancelled) => return Err(CacheError::Cancelled),
                Lookup::Failed(e) => {
                    debug!(key = %request.key, tier = tier.name(), error = %e, "Tier failed");
                    last_failure = Some(e);
                }
            }
        }

        Err(last_failure.unwrap_or_else(|| CacheError::NotFound(request.key.to_string())))
    }

    // == Store ==
    /// Writes to every tier concurrently and waits for all of them.
    pub async fn store(&self, payload: &Payload, key: &CacheKey, ttl: Duration) {
        let Some(state) = self.state() else {
            return;
        };
        join_all(state.tiers.iter().map(|t| t.store(payload, key, ttl))).await;
    }

    pub async fn clear(&self) {
        let Some(state) = self.state() else {
            return;
        };
        join_all(state.tiers.iter().map(|t| t.clear())).await;
    }

    pub async fn clear_expired(&self) {
        let Some(state) = self.state() else {
            return;
        };
        join_all(state.tiers.iter().map(|t| t.clear_expired())).await;
    }

    pub async fn handle_event(&self, event: LifecycleEvent) {
        let Some(state) = self.state() else {
            return;
        };
        join_all(state.tiers.iter().map(|t| t.handle_event(event))).await;
    }

    // == Size ==
    /// Sums tier sizes per medium. Network tiers hold nothing.
    pub async fn size(&self) -> CacheSize {
        let Some(state) = self.state() else {
            return CacheSize::default();
        };
        let sizes = join_all(state.tiers.iter().map(|t| async move {
            (t.medium(), t.size_bytes().await)
        }))
        .await;

        let mut total = CacheSize::default();
        for (medium, bytes) in sizes {
            match medium {
                Medium::Memory => total.memory_bytes += bytes,
                Medium::Disk => total.disk_bytes += bytes,
                Medium::Network => {}
            }
        }
        total
    }
}
