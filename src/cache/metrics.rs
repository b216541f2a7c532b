//! Cache Metrics Module
//!
//! Tracks which tier satisfied each lookup, misses, and lookup latency.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

#[derive(Debug, Default, Clone, Copy)]
struct TierCounters {
    hits: u64,
    total_latency: Duration,
}

#[derive(Debug, Default)]
struct Counters {
    tiers: HashMap<String, TierCounters>,
    misses: u64,
    cancelled: u64,
}

// == Metrics Collector ==
/// Thread-safe running counters. Observational only; never gates a load.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    counters: Mutex<Counters>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    // == Record Hit ==
    /// Records a lookup satisfied by `tier` after `latency`.
    pub fn record_hit(&self, tier: &str, latency: Duration) {
        let mut counters = self.counters.lock();
        let entry = counters.tiers.entry(tier.to_string()).or_default();
        entry.hits += 1;
        entry.total_latency += latency;
    }

    // == Record Miss ==
    /// Records a lookup that exhausted every tier or failed.
    pub fn record_miss(&self) {
        self.counters.lock().misses += 1;
    }

    pub fn record_cancelled(&self) {
        self.counters.lock().cancelled += 1;
    }

    pub fn reset(&self) {
        *self.counters.lock() = Counters::default();
    }

    // == Snapshot ==
    /// Builds an immutable aggregate of the counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let counters = self.counters.lock();

        let mut hits_per_tier = BTreeMap::new();
        let mut avg_latency_ms_per_tier = BTreeMap::new();
        for (tier, c) in &counters.tiers {
            hits_per_tier.insert(tier.clone(), c.hits);
            let avg = if c.hits == 0 {
                0.0
            } else {
                c.total_latency.as_secs_f64() * 1000.0 / c.hits as f64
            };
            avg_latency_ms_per_tier.insert(tier.clone(), avg);
        }

        let hits: u64 = hits_per_tier.values().sum();
        let total = hits + counters.misses;
        let hit_rate = if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        };

        MetricsSnapshot {
            hits_per_tier,
            misses: counters.misses,
            cancelled: counters.cancelled,
            hit_rate,
            avg_latency_ms_per_tier,
            taken_at: Utc::now(),
        }
    }
}

/// Point-in-time view of the collector.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Lookups satisfied per tier name
    pub hits_per_tier: BTreeMap<String, u64>,
    /// Lookups that found nothing or failed
    pub misses: u64,
    /// Lookups resolved as cancelled
    pub cancelled: u64,
    /// hits / (hits + misses), 0.0 before any lookup
    pub hit_rate: f64,
    /// Mean whole-chain latency of the lookups each tier satisfied
    pub avg_latency_ms_per_tier: BTreeMap<String, f64>,
    pub taken_at: DateTime<Utc>,
}

impl MetricsSnapshot {
    pub fn total_hits(&self) -> u64 {
        self.hits_per_tier.values().sum()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_empty_snapshot() {
        let snapshot = MetricsCollector::new().snapshot();
        assert!(snapshot.hits_per_tier.is_empty());
        assert_eq!(snapshot.misses, 0);
        assert_eq!(snapshot.hit_rate, 0.0);
    }

    #[test]
    fn test_hit_rate_and_latency() {
        let metrics = MetricsCollector::new();
        metrics.record_hit("memory", Duration::from_millis(2));
        metrics.record_hit("memory", Duration::from_millis(4));
        metrics.record_hit("disk", Duration::from_millis(10));
        metrics.record_miss();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.hits_per_tier["memory"], 2);
        assert_eq!(snapshot.hits_per_tier["disk"], 1);
        assert_eq!(snapshot.total_hits(), 3);
        assert_eq!(snapshot.hit_rate, 0.75);
        assert!((snapshot.avg_latency_ms_per_tier["memory"] - 3.0).abs() < 1e-9);
        assert!((snapshot.avg_latency_ms_per_tier["disk"] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_snapshot_is_detached_from_collector() {
        let metrics = MetricsCollector::new();
        metrics.record_miss();
        let before = metrics.snapshot();

        metrics.record_miss();
        assert_eq!(before.misses, 1);
        assert_eq!(metrics.snapshot().misses, 2);
    }

    #[test]
    fn test_reset() {
        let metrics = MetricsCollector::new();
        metrics.record_hit("memory", Duration::from_millis(1));
        metrics.record_cancelled();
        metrics.reset();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_hits(), 0);
        assert_eq!(snapshot.cancelled, 0);
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let metrics = Arc::new(MetricsCollector::new());
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let metrics = metrics.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        metrics.record_hit("memory", Duration::from_micros(1));
                        metrics.record_miss();
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.hits_per_tier["memory"], 8000);
        assert_eq!(snapshot.misses, 8000);
    }
}
