//! Cache Module
//!
//! Multi-tier image cache: memory, disk and origin tiers behind one chain.
//!
//! ```text
//! ImageCache::load ──► TierChain ──► MemoryTier ──► DiskTier ──► OriginTier
//!                         │               ▲             ▲
//!                         └── promotion ──┴─────────────┘
//! ```

mod chain;
mod codec;
mod disk;
mod entry;
mod key;
mod lru;
mod memory;
mod metrics;
mod origin;
mod service;
mod tier;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use chain::{CacheSize, ChainHit, ChainState, TierChain};
pub use codec::{Dimensions, ImageCodec, StandardCodec};
pub use disk::{DiskTier, EvictionResult};
pub use entry::{Entry, Payload};
pub use key::CacheKey;
pub use lru::LruTracker;
pub use memory::MemoryTier;
pub use metrics::{MetricsCollector, MetricsSnapshot};
pub use origin::{HttpTransport, OriginTier, Transport};
pub use service::{ImageCache, LoadOptions, LoadTask};
pub use tier::{LifecycleEvent, Lookup, Medium, Tier, TierRequest};
