//! Memory Tier Module
//!
//! Fast tier: HashMap storage with LRU tracking, byte and count budgets,
//! and lazy TTL expiry.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::cache::{
    CacheKey, Entry, LifecycleEvent, LruTracker, Lookup, Medium, Payload, Tier, TierRequest,
};

/// Budget divisor applied while the host process is in the background.
const BACKGROUND_BUDGET_DIVISOR: u64 = 4;

// == Memory Tier ==
/// Bounded in-memory tier.
pub struct MemoryTier {
    name: String,
    /// Budgets to return to on foreground resume
    configured: Limits,
    state: Mutex<MemoryState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Limits {
    cost: u64,
    count: usize,
}

#[derive(Debug)]
struct MemoryState {
    entries: HashMap<CacheKey, Entry>,
    lru: LruTracker<CacheKey>,
    used_bytes: u64,
    limits: Limits,
    evictions: u64,
}

impl MemoryState {
    fn remove(&mut self, key: &CacheKey) -> Option<Entry> {
        let entry = self.entries.remove(key)?;
        self.lru.remove(key);
        self.used_bytes = self.used_bytes.saturating_sub(entry.size_bytes);
        Some(entry)
    }

    fn over_budget(&self) -> bool {
        self.used_bytes > self.limits.cost || self.entries.len() > self.limits.count
    }

    // == Evict ==
    /// Evicts least recently used entries until both budgets hold.
    fn evict_over_budget(&mut self) -> usize {
        let mut evicted = 0;
        while self.over_budget() {
            let Some(oldest) = self.lru.evict_oldest() else {
                break;
            };
            if let Some(entry) = self.entries.remove(&oldest) {
                self.used_bytes = self.used_bytes.saturating_sub(entry.size_bytes);
                self.evictions += 1;
                evicted += 1;
            }
        }
        evicted
    }
}

impl MemoryTier {
    // == Constructor ==
    /// Creates a memory tier with the given byte and entry budgets.
    pub fn new(cost_limit: u64, count_limit: usize) -> Self {
        let limits = Limits {
            cost: cost_limit,
            count: count_limit,
        };
        Self {
            name: "memory".to_string(),
            configured: limits,
            state: Mutex::new(MemoryState {
                entries: HashMap::new(),
                lru: LruTracker::new(),
                used_bytes: 0,
                limits,
                evictions: 0,
            }),
        }
    }

    // == Update Limits ==
    /// Replaces the active budgets and evicts immediately if over them.
    ///
    /// Evicted content is not rehydrated when budgets grow again.
    pub fn update_limits(&self, cost_limit: u64, count_limit: usize) {
        let mut state = self.state.lock();
        state.limits = Limits {
            cost: cost_limit,
            count: count_limit,
        };
        let evicted = state.evict_over_budget();
        if evicted > 0 {
            info!(
                tier = %self.name,
                evicted,
                cost_limit,
                count_limit,
                "Memory tier shrunk"
            );
        }
    }

    /// Returns the active (cost, count) budgets.
    pub fn limits(&self) -> (u64, usize) {
        let state = self.state.lock();
        (state.limits.cost, state.limits.count)
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.state.lock().entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn used_bytes(&self) -> u64 {
        self.state.lock().used_bytes
    }

    /// Total number of budget evictions since creation.
    pub fn evictions(&self) -> u64 {
        self.state.lock().evictions
    }

    fn get(&self, key: &CacheKey) -> Option<Entry> {
        let mut state = self.state.lock();
        let expired = state.entries.get(key)?.is_expired();
        if expired {
            state.remove(key);
            return None;
        }
        state.lru.touch(key);
        state.entries.get(key).cloned()
    }

    fn insert(&self, key: &CacheKey, payload: &Payload, ttl: Duration) {
        let mut state = self.state.lock();
        state.remove(key);

        // Admitting an entry that can never fit would flush everything else first
        let entry = Entry::new(payload.clone(), ttl);
        if entry.size_bytes > state.limits.cost || state.limits.count == 0 {
            debug!(
                tier = %self.name,
                key = %key,
                bytes = entry.size_bytes,
                "Payload exceeds memory budget, not cached"
            );
            return;
        }
        state.used_bytes += entry.size_bytes;
        state.entries.insert(key.clone(), entry);
        state.lru.touch(key);

        let evicted = state.evict_over_budget();
        if evicted > 0 {
            debug!(tier = %self.name, evicted, "Evicted entries over budget");
        }
    }
}

#[async_trait]
impl Tier for MemoryTier {
    fn name(&self) -> &str {
        &self.name
    }

    fn medium(&self) -> Medium {
        Medium::Memory
    }

    async fn load(&self, request: &TierRequest) -> Lookup {
        match self.get(&request.key) {
            Some(entry) => Lookup::Hit(entry),
            None => Lookup::Miss,
        }
    }

    async fn store(&self, payload: &Payload, key: &CacheKey, ttl: Duration) {
        self.insert(key, payload, ttl);
    }

    async fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.lru.clear();
        state.used_bytes = 0;
    }

    async fn size_bytes(&self) -> u64 {
        self.used_bytes()
    }

    async fn handle_event(&self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::LowMemory => {
                info!(tier = %self.name, "Low memory, clearing memory tier");
                self.clear().await;
            }
            LifecycleEvent::EnterBackground => self.update_limits(
                self.configured.cost / BACKGROUND_BUDGET_DIVISOR,
                self.configured.count / BACKGROUND_BUDGET_DIVISOR as usize,
            ),
            LifecycleEvent::EnterForeground => {
                self.update_limits(self.configured.cost, self.configured.count)
            }
        }
    }
}
