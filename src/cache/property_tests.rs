//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check tier invariants over arbitrary operation sequences.

use std::collections::HashMap;
use std::time::Duration;

use proptest::prelude::*;

use crate::cache::{CacheKey, Lookup, MemoryTier, Payload, Tier, TierRequest};

// == Test Configuration ==
const TTL: Duration = Duration::from_secs(300);

// == Strategies ==
/// Generates cache keys from a small alphabet so sequences revisit keys
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-f]{1,2}"
}

fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..64)
}

#[derive(Debug, Clone)]
enum TierOp {
    Store { key: String, payload: Vec<u8> },
    Load { key: String },
    Shrink { cost: u64, count: usize },
}

fn tier_op_strategy() -> impl Strategy<Value = TierOp> {
    prop_oneof![
        4 => (key_strategy(), payload_strategy())
            .prop_map(|(key, payload)| TierOp::Store { key, payload }),
        4 => key_strategy().prop_map(|key| TierOp::Load { key }),
        1 => (0u64..256, 0usize..8).prop_map(|(cost, count)| TierOp::Shrink { cost, count }),
    ]
}

fn run<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Whatever the operation sequence, the memory tier never holds more than
    // its active byte and count budgets.
    #[test]
    fn prop_memory_tier_respects_budgets(
        cost in 0u64..512,
        count in 0usize..16,
        ops in prop::collection::vec(tier_op_strategy(), 1..60),
    ) {
        run(async {
            let tier = MemoryTier::new(cost, count);
            for op in ops {
                match op {
                    TierOp::Store { key, payload } => {
                        tier.store(&Payload::from(payload), &CacheKey::new(key), TTL).await;
                    }
                    TierOp::Load { key } => {
                        let _ = tier.load(&TierRequest::new(CacheKey::new(key), TTL)).await;
                    }
                    TierOp::Shrink { cost, count } => tier.update_limits(cost, count),
                }
                let (cost_limit, count_limit) = tier.limits();
                prop_assert!(tier.used_bytes() <= cost_limit);
                prop_assert!(tier.len() <= count_limit);
            }
            Ok(())
        })?;
    }

    // A hit always returns the payload most recently stored under that key,
    // never one stored under another key.
    #[test]
    fn prop_memory_tier_never_cross_contaminates(
        ops in prop::collection::vec(tier_op_strategy(), 1..60),
    ) {
        run(async {
            let tier = MemoryTier::new(u64::MAX, usize::MAX);
            let mut latest: HashMap<String, Vec<u8>> = HashMap::new();

            for op in ops {
                match op {
                    TierOp::Store { key, payload } => {
                        tier.store(&Payload::from(payload.clone()), &CacheKey::new(key.clone()), TTL).await;
                        latest.insert(key, payload);
                    }
                    TierOp::Load { key } => {
                        match tier.load(&TierRequest::new(CacheKey::new(key.clone()), TTL)).await {
                            Lookup::Hit(entry) => {
                                prop_assert_eq!(Some(entry.payload.as_bytes()), latest.get(&key).map(|v| v.as_slice()));
                            }
                            _ => prop_assert!(!latest.contains_key(&key)),
                        }
                    }
                    TierOp::Shrink { .. } => {}
                }
            }
            Ok(())
        })?;
    }

    // Content addresses are deterministic and distinct for distinct keys.
    #[test]
    fn prop_content_address_is_deterministic(a in ".{0,64}", b in ".{0,64}") {
        let ka = CacheKey::new(a.clone());
        let kb = CacheKey::new(b.clone());
        prop_assert_eq!(ka.content_address(), CacheKey::new(a.clone()).content_address());
        prop_assert_eq!(ka.content_address().len(), 64);
        prop_assert_eq!(a == b, ka.content_address() == kb.content_address());
    }
}
