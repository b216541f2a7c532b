//! LRU Tracker Module
//!
//! Least Recently Used ordering for the in-memory tier.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

// == LRU Tracker ==
/// Tracks access order for LRU eviction.
///
/// Every touch stamps the key with the next sequence number:
/// - Highest stamp = Most recently used
/// - Lowest stamp = Least recently used
///
/// `touch`, `remove` and `evict_oldest` are O(log n) in the number of keys.
#[derive(Debug)]
pub struct LruTracker<K> {
    stamps: HashMap<K, u64>,
    order: BTreeMap<u64, K>,
    next: u64,
}

impl<K> Default for LruTracker<K> {
    fn default() -> Self {
        Self {
            stamps: HashMap::new(),
            order: BTreeMap::new(),
            next: 0,
        }
    }
}

impl<K: Eq + Hash + Clone> LruTracker<K> {
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as most recently used.
    pub fn touch(&mut self, key: &K) {
        let stamp = self.next;
        self.next += 1;
        if let Some(previous) = self.stamps.insert(key.clone(), stamp) {
            self.order.remove(&previous);
        }
        self.order.insert(stamp, key.clone());
    }

    pub fn remove(&mut self, key: &K) {
        if let Some(stamp) = self.stamps.remove(key) {
            self.order.remove(&stamp);
        }
    }

    // == Evict Oldest ==
    /// Removes and returns the least recently used key.
    pub fn evict_oldest(&mut self) -> Option<K> {
        let (_, key) = self.order.pop_first()?;
        self.stamps.remove(&key);
        Some(key)
    }

    pub fn peek_oldest(&self) -> Option<&K> {
        self.order.first_key_value().map(|(_, key)| key)
    }

    pub fn clear(&mut self) {
        self.stamps.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
