//! Image Tier Cache - A multi-tier image cache
//!
//! Resolves image locators through memory, disk and origin tiers with TTL
//! expiry, LRU eviction, promotion and cooperative cancellation.

pub mod api;
pub mod cache;
pub mod cancel;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::ImageCache;
pub use cancel::CancellationHandle;
pub use config::Config;
pub use error::CacheError;
pub use tasks::spawn_sweep_task;
