//! Expiry Sweep Task
//!
//! Background task that periodically asks every tier to drop expired entries.
//! Lookups already evict lazily; the sweep reclaims entries nobody reads again.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::ImageCache;

/// Spawns a background task that sweeps expired entries out of the cache.
///
/// # Arguments
/// * `cache` - Shared cache whose tiers are swept
/// * `interval` - Time between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, aborted during graceful shutdown.
pub fn spawn_sweep_task(cache: Arc<ImageCache>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Starting expiry sweep task with interval of {:?}",
            interval
        );

        loop {
            tokio::time::sleep(interval).await;

            cache.clear_expired().await;
            let size = cache.cache_size().await;
            debug!(
                memory_bytes = size.memory_bytes,
                disk_bytes = size.disk_bytes,
                "Expiry sweep finished"
            );
        }
    })
}
