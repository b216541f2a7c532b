//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const MIB: u64 = 1024 * 1024;
const DAY_SECS: u64 = 24 * 60 * 60;

/// Cache and server configuration parameters.
///
/// Read-only to the cache once applied; a new `Config` is applied by
/// replacing the whole tier set (see [`crate::cache::ImageCache::configure`]).
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Byte budget of the in-memory tier
    pub memory_cost_limit: u64,
    /// Entry count budget of the in-memory tier
    pub memory_count_limit: usize,
    /// Byte budget of the on-disk tier
    pub disk_size_limit: u64,
    /// Age after which disk entries are swept by `clear_expired`
    pub disk_max_age: Duration,
    /// TTL applied when a caller does not supply one
    pub default_ttl: Duration,
    /// Largest origin response body held in memory
    pub origin_memory_limit: u64,
    /// Transport-level on-disk budget for origin responses
    pub origin_disk_limit: u64,
    /// Longer-axis limit for fetched images, None = never downscale
    pub max_dimension: Option<u32>,
    /// Private root directory of the disk tier
    pub cache_dir: PathBuf,
    /// Origin request timeout
    pub request_timeout: Duration,
    /// HTTP server port
    pub server_port: u16,
    /// Interval of the background expiry sweep
    pub sweep_interval: Duration,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MEMORY_COST_LIMIT` - Memory tier bytes (default: 64 MiB)
    /// - `MEMORY_COUNT_LIMIT` - Memory tier entries (default: 100)
    /// - `DISK_SIZE_LIMIT` - Disk tier bytes (default: 512 MiB)
    /// - `DISK_MAX_AGE` - Disk entry max age in seconds (default: 7 days)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 7 days)
    /// - `ORIGIN_MEMORY_LIMIT` - Max origin body bytes (default: 20 MiB)
    /// - `ORIGIN_DISK_LIMIT` - Origin transport disk bytes (default: 100 MiB)
    /// - `MAX_DIMENSION` - Downscale limit in pixels (default: unset)
    /// - `CACHE_DIR` - Disk tier root (default: `$TMPDIR/image_tier_cache`)
    /// - `REQUEST_TIMEOUT` - Origin timeout in seconds (default: 30)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `SWEEP_INTERVAL` - Expiry sweep frequency in seconds (default: 300, zero ignored)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            memory_cost_limit: env_or("MEMORY_COST_LIMIT", defaults.memory_cost_limit),
            memory_count_limit: env_or("MEMORY_COUNT_LIMIT", defaults.memory_count_limit),
            disk_size_limit: env_or("DISK_SIZE_LIMIT", defaults.disk_size_limit),
            disk_max_age: env_secs_or("DISK_MAX_AGE", defaults.disk_max_age),
            default_ttl: env_secs_or("DEFAULT_TTL", defaults.default_ttl),
            origin_memory_limit: env_or("ORIGIN_MEMORY_LIMIT", defaults.origin_memory_limit),
            origin_disk_limit: env_or("ORIGIN_DISK_LIMIT", defaults.origin_disk_limit),
            max_dimension: env::var("MAX_DIMENSION")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&px: &u32| px > 0),
            cache_dir: env::var("CACHE_DIR")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            request_timeout: env_secs_or("REQUEST_TIMEOUT", defaults.request_timeout),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            sweep_interval: env_interval_or("SWEEP_INTERVAL", defaults.sweep_interval),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            memory_cost_limit: 64 * MIB,
            memory_count_limit: 100,
            disk_size_limit: 512 * MIB,
            disk_max_age: Duration::from_secs(7 * DAY_SECS),
            default_ttl: Duration::from_secs(7 * DAY_SECS),
            origin_memory_limit: 20 * MIB,
            origin_disk_limit: 100 * MIB,
            max_dimension: None,
            cache_dir: env::temp_dir().join("image_tier_cache"),
            request_timeout: Duration::from_secs(30),
            server_port: 3000,
            sweep_interval: Duration::from_secs(300),
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_secs_or(name: &str, default: Duration) -> Duration {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

/// Like `env_secs_or`, but a zero interval falls back to the default.
fn env_interval_or(name: &str, default: Duration) -> Duration {
    Some(env_secs_or(name, default))
        .filter(|interval| !interval.is_zero())
        .unwrap_or(default)
}
