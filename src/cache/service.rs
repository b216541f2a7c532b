//! Image Cache Service
//!
//! The facade callers hold: an explicitly constructed chain plus metrics,
//! shared by `Arc` from the application's composition root.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use reqwest::Url;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cache::{
    CacheKey, CacheSize, DiskTier, LifecycleEvent, MemoryTier, MetricsCollector, MetricsSnapshot,
    OriginTier, Payload, Tier, TierChain, TierRequest,
};
use crate::cancel::CancellationHandle;
use crate::config::Config;
use crate::error::{CacheError, Result};

/// Optional arguments of [`ImageCache::load`].
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit key, defaults to the locator's canonical string
    pub key: Option<CacheKey>,
    /// Freshness bound, defaults to the configured TTL
    pub ttl: Option<Duration>,
    pub cancel: Option<CancellationHandle>,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(mut self, key: impl Into<CacheKey>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn cancel(mut self, cancel: CancellationHandle) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// A lookup running in the background.
///
/// The handle is available as soon as the task starts; `wait` resolves to the
/// lookup result, or `Cancelled` if the handle was cancelled first.
pub struct LoadTask {
    handle: CancellationHandle,
    join: JoinHandle<Result<Payload>>,
}

impl LoadTask {
    pub fn handle(&self) -> &CancellationHandle {
        &self.handle
    }

    pub fn cancel(&self) {
        self.handle.cancel();
    }

    pub async fn wait(self) -> Result<Payload> {
        match self.join.await {
            Ok(result) => result,
            Err(e) => Err(CacheError::Unknown(format!("load task failed: {}", e))),
        }
    }
}

// == Image Cache ==
/// Multi-tier image cache.
pub struct ImageCache {
    chain: TierChain,
    metrics: MetricsCollector,
    /// Disk tier built by the last `configure`, reused while its root is unchanged
    disk: Mutex<Option<Arc<DiskTier>>>,
}

impl ImageCache {
    /// Creates a cache with the standard memory, disk and HTTP origin tiers.
    pub fn new(config: Config) -> Result<Self> {
        let cache = Self::unconfigured();
        cache.configure(config)?;
        Ok(cache)
    }

    /// Creates a cache with no tiers; every lookup misses until configured.
    pub fn unconfigured() -> Self {
        Self {
            chain: TierChain::new(),
            metrics: MetricsCollector::new(),
            disk: Mutex::new(None),
        }
    }

    /// Creates a cache over caller-supplied tiers.
    pub fn with_tiers(tiers: Vec<Arc<dyn Tier>>, config: Config) -> Self {
        let cache = Self::unconfigured();
        cache.chain.install(tiers, config);
        cache
    }

    // == Configure ==
    /// Builds the standard memory, disk and origin tiers from `config` and
    /// swaps them in atomically.
    ///
    /// The disk tier is carried over when `cache_dir` is unchanged, keeping its
    /// access order and its lock. On error the previous tiers stay active.
    pub fn configure(&self, config: Config) -> Result<()> {
        let origin = OriginTier::from_config(&config)?;
        let disk = self.disk_tier_for(&config)?;
        let memory = MemoryTier::new(config.memory_cost_limit, config.memory_count_limit);
        let tiers: Vec<Arc<dyn Tier>> = vec![Arc::new(memory), disk.clone(), Arc::new(origin)];

        info!(
            memory_cost_limit = config.memory_cost_limit,
            memory_count_limit = config.memory_count_limit,
            disk_size_limit = config.disk_size_limit,
            origin_memory_limit = config.origin_memory_limit,
            origin_disk_limit = config.origin_disk_limit,
            cache_dir = %config.cache_dir.display(),
            "Applying cache configuration"
        );
        self.chain.install(tiers, config);
        *self.disk.lock() = Some(disk);
        Ok(())
    }

    fn disk_tier_for(&self, config: &Config) -> Result<Arc<DiskTier>> {
        let current = self.disk.lock().clone();
        if let Some(disk) = current.filter(|d| d.root() == config.cache_dir.as_path()) {
            disk.update_limits(config.disk_size_limit, config.disk_max_age);
            return Ok(disk);
        }
        let disk = DiskTier::new(&config.cache_dir, config.disk_size_limit, config.disk_max_age)?;
        Ok(Arc::new(disk))
    }

    /// Substitutes the tier list, keeping the active configuration.
    pub fn set_tiers(&self, tiers: Vec<Arc<dyn Tier>>) {
        self.chain.set_tiers(tiers);
    }

    pub fn chain(&self) -> &TierChain {
        &self.chain
    }

    pub fn default_ttl(&self) -> Duration {
        self.chain
            .config()
            .map(|c| c.default_ttl)
            .unwrap_or_else(|| Config::default().default_ttl)
    }

    // == Load ==
    /// Resolves `locator` through the tiers.
    ///
    /// The locator is validated before any tier is consulted.
    pub async fn load(&self, locator: &str, options: LoadOptions) -> Result<Payload> {
        let url = parse_locator(locator)?;
        let key = options.key.unwrap_or_else(|| CacheKey::from_locator(&url));
        let request = TierRequest::new(key, options.ttl.unwrap_or_else(|| self.default_ttl()))
            .with_locator(url)
            .with_cancel(options.cancel.unwrap_or_default());
        self.run(request).await
    }

    /// Resolves a key without an origin locator; only caching tiers can hit.
    pub async fn load_key(
        &self,
        key: CacheKey,
        ttl: Option<Duration>,
        cancel: Option<CancellationHandle>,
    ) -> Result<Payload> {
        if key.as_str().is_empty() {
            return Err(CacheError::InvalidLocator("Key cannot be empty".to_string()));
        }
        let request = TierRequest::new(key, ttl.unwrap_or_else(|| self.default_ttl()))
            .with_cancel(cancel.unwrap_or_default());
        self.run(request).await
    }

    /// Starts a lookup on the runtime and returns its cancellation handle.
    pub fn spawn_load(self: &Arc<Self>, locator: &str, mut options: LoadOptions) -> LoadTask {
        let handle = options.cancel.clone().unwrap_or_default();
        options.cancel = Some(handle.clone());

        let cache = Arc::clone(self);
        let locator = locator.to_string();
        let join = tokio::spawn(async move { cache.load(&locator, options).await });

        LoadTask { handle, join }
    }

    async fn run(&self, request: TierRequest) -> Result<Payload> {
        let start = Instant::now();
        let result = self.chain.load(&request).await;

        match &result {
            Ok(hit) => self.metrics.record_hit(&hit.tier, start.elapsed()),
            Err(CacheError::Cancelled) => self.metrics.record_cancelled(),
            Err(_) => self.metrics.record_miss(),
        }

        result.map(|hit| hit.entry.payload)
    }

    // == Store ==
    /// Writes `payload` to every tier. Tier failures are logged, not returned.
    pub async fn store(&self, payload: Payload, key: CacheKey, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or_else(|| self.default_ttl());
        self.chain.store(&payload, &key, ttl).await;
    }

    pub async fn clear_all(&self) {
        self.chain.clear().await;
        info!("All cache tiers cleared");
    }

    pub async fn clear_expired(&self) {
        self.chain.clear_expired().await;
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn reset_metrics(&self) {
        self.metrics.reset();
    }

    pub async fn cache_size(&self) -> CacheSize {
        self.chain.size().await
    }

    // == Lifecycle ==
    /// Delivers a host lifecycle signal to every tier.
    pub async fn handle_event(&self, event: LifecycleEvent) {
        if !self.chain.is_configured() {
            warn!(%event, "Lifecycle event before configuration, ignoring");
            return;
        }
        info!(%event, "Handling lifecycle event");
        self.chain.handle_event(event).await;
    }
}

fn parse_locator(locator: &str) -> Result<Url> {
    let url = Url::parse(locator)
        .map_err(|e| CacheError::InvalidLocator(format!("'{}': {}", locator, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(CacheError::InvalidLocator(format!(
            "unsupported scheme '{}'",
            scheme
        ))),
    }
}
