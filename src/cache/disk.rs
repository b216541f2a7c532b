//! Disk Tier Module
//!
//! Durable tier: one file per entry, named by the SHA-256 digest of the key.
//!
//! # Design
//!
//! - Expiry is lazy and active: `load` compares the file mtime against the
//!   request TTL and deletes stale files on touch.
//! - Every `store` is followed by a cleanup pass. When the directory exceeds
//!   its byte budget, files are deleted in least-recently-accessed order until
//!   the directory is at 75% of the budget.
//! - Access order comes from an in-process index, seeded lazily from the
//!   filesystem atime (or mtime) for files written by earlier runs.
//! - One async mutex serializes load, store, clear and cleanup so a reader
//!   never sees a file that is being replaced or evicted.
//! - A payload larger than the whole budget is refused, and cleanup never
//!   evicts the file the current store just wrote.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, Entry, LifecycleEvent, Lookup, Medium, Payload, Tier, TierRequest};

/// Extension of in-progress writes; never counted as entries.
const TEMP_EXTENSION: &str = "tmp";

/// Directory size after eviction, as a fraction of the budget (numerator/denominator).
const EVICTION_TARGET: (u64, u64) = (3, 4);

/// Result of one cleanup pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvictionResult {
    /// Number of files deleted
    pub files_deleted: usize,
    /// Total bytes freed
    pub bytes_freed: u64,
    /// Directory size before eviction
    pub size_before: u64,
    /// Directory size after eviction
    pub size_after: u64,
}

/// Last-access stamps of entry files touched by this process.
#[derive(Debug, Default)]
struct AccessIndex {
    stamps: HashMap<PathBuf, SystemTime>,
    last: Option<SystemTime>,
}

impl AccessIndex {
    /// Records an access. Stamps are strictly increasing so that two touches
    /// within the clock resolution still order correctly.
    fn touch(&mut self, path: &Path) {
        let now = SystemTime::now();
        let stamp = match self.last {
            Some(last) if now <= last => last + Duration::from_nanos(1),
            _ => now,
        };
        self.last = Some(stamp);
        self.stamps.insert(path.to_path_buf(), stamp);
    }

    fn forget(&mut self, path: &Path) {
        self.stamps.remove(path);
    }

    fn last_access(&self, path: &Path) -> Option<SystemTime> {
        self.stamps.get(path).copied()
    }

    fn clear(&mut self) {
        self.stamps.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DiskLimits {
    size_limit: u64,
    max_age: Duration,
}

#[derive(Debug, Clone)]
struct EntryFile {
    path: PathBuf,
    size: u64,
    modified: SystemTime,
    accessed: SystemTime,
}

// == Disk Tier ==
/// Content-addressed on-disk tier with TTL expiry and LRU eviction.
pub struct DiskTier {
    name: String,
    root: PathBuf,
    limits: RwLock<DiskLimits>,
    index: Mutex<AccessIndex>,
}

impl DiskTier {
    /// Creates the tier rooted at `root`, creating the directory if needed.
    ///
    /// # Arguments
    /// * `root` - Private cache directory
    /// * `size_limit` - Byte budget enforced after every store
    /// * `max_age` - Age past which `clear_expired` removes files
    pub fn new(root: impl Into<PathBuf>, size_limit: u64, max_age: Duration) -> io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            name: "disk".to_string(),
            root,
            limits: RwLock::new(DiskLimits {
                size_limit,
                max_age,
            }),
            index: Mutex::new(AccessIndex::default()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Replaces the byte budget and max age. Takes effect on the next store
    /// or sweep; the access index is kept.
    pub fn update_limits(&self, size_limit: u64, max_age: Duration) {
        *self.limits.write() = DiskLimits {
            size_limit,
            max_age,
        };
    }

    /// Returns the active (size_limit, max_age).
    pub fn limits(&self) -> (u64, Duration) {
        let limits = *self.limits.read();
        (limits.size_limit, limits.max_age)
    }

    fn size_limit(&self) -> u64 {
        self.limits.read().size_limit
    }

    /// Path of the file holding `key`.
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.content_address())
    }

    pub async fn contains(&self, key: &CacheKey) -> bool {
        tokio::fs::metadata(self.entry_path(key))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    // == Cleanup ==
    /// Runs an eviction pass against the byte budget.
    pub async fn cleanup(&self) -> EvictionResult {
        let mut index = self.index.lock().await;
        self.cleanup_locked(&mut index, None).await
    }

    /// Evicts least recently accessed files, never `keep`.
    async fn cleanup_locked(&self, index: &mut AccessIndex, keep: Option<&Path>) -> EvictionResult {
        let files = match self.scan().await {
            Ok(files) => files,
            Err(e) => {
                warn!(tier = %self.name, error = %e, "Failed to scan disk tier for cleanup");
                return EvictionResult::default();
            }
        };

        let size_limit = self.size_limit();
        let size_before: u64 = files.iter().map(|f| f.size).sum();
        if size_before <= size_limit {
            return EvictionResult {
                size_before,
                size_after: size_before,
                ..Default::default()
            };
        }

        let target = eviction_target(size_limit);

        // Oldest access first; path breaks ties deterministically
        let mut candidates: Vec<(SystemTime, PathBuf, u64)> = files
            .into_iter()
            .filter(|f| Some(f.path.as_path()) != keep)
            .map(|f| {
                let stamp = index.last_access(&f.path).unwrap_or(f.accessed);
                (stamp, f.path, f.size)
            })
            .collect();
        candidates.sort();

        let mut result = EvictionResult {
            size_before,
            size_after: size_before,
            ..Default::default()
        };

        for (_, path, size) in candidates {
            if result.size_after <= target {
                break;
            }
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    index.forget(&path);
                    result.files_deleted += 1;
                    result.bytes_freed += size;
                    result.size_after = result.size_after.saturating_sub(size);
                }
                Err(e) => {
                    debug!(
                        path = %path.display(),
                        error = %e,
                        "Failed to delete cache file during eviction"
                    );
                }
            }
        }

        info!(
            tier = %self.name,
            files_deleted = result.files_deleted,
            bytes_freed = result.bytes_freed,
            size_before = result.size_before,
            size_after = result.size_after,
            limit_bytes = size_limit,
            "Disk tier eviction complete"
        );

        result
    }

    async fn scan(&self) -> io::Result<Vec<EntryFile>> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || scan_entries(&root))
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
    }

    async fn write_atomic(&self, path: &Path, payload: &Payload) -> io::Result<()> {
        let temp_path = path.with_extension(TEMP_EXTENSION);
        tokio::fs::create_dir_all(&self.root).await?;

        let written = async {
            tokio::fs::write(&temp_path, payload.as_bytes()).await?;
            tokio::fs::rename(&temp_path, path).await
        }
        .await;

        if written.is_err() {
            let _ = tokio::fs::remove_file(&temp_path).await;
        }
        written
    }
}

#[async_trait]
impl Tier for DiskTier {
    fn name(&self) -> &str {
        &self.name
    }

    fn medium(&self) -> Medium {
        Medium::Disk
    }

    async fn load(&self, request: &TierRequest) -> Lookup {
        let path = self.entry_path(&request.key);
        let mut index = self.index.lock().await;

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Lookup::Miss,
            Err(e) => {
                warn!(key = %request.key, error = %e, "Failed to stat disk entry");
                return Lookup::Miss;
            }
        };

        let modified = metadata.modified().unwrap_or_else(|_| SystemTime::now());
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);

        if age > request.ttl {
            debug!(key = %request.key, age_secs = age.as_secs(), "Disk entry expired");
            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!(key = %request.key, error = %e, "Failed to delete expired disk entry");
            }
            index.forget(&path);
            return Lookup::Miss;
        }

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                index.touch(&path);
                Lookup::Hit(Entry::created_at(
                    Payload::from(bytes),
                    request.ttl,
                    modified,
                ))
            }
            Err(e) => {
                warn!(key = %request.key, error = %e, "Failed to read disk entry");
                Lookup::Miss
            }
        }
    }

    async fn store(&self, payload: &Payload, key: &CacheKey, _ttl: Duration) {
        let path = self.entry_path(key);
        let mut index = self.index.lock().await;

        let size_limit = self.size_limit();
        if payload.len() as u64 > size_limit {
            warn!(
                key = %key,
                bytes = payload.len(),
                limit_bytes = size_limit,
                "Payload exceeds disk budget, not cached"
            );
            // The previous value must not outlive a refused overwrite
            match tokio::fs::remove_file(&path).await {
                Ok(()) => index.forget(&path),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(key = %key, error = %e, "Failed to delete replaced disk entry"),
            }
            return;
        }

        if let Err(e) = self.write_atomic(&path, payload).await {
            warn!(key = %key, error = %e, "Failed to write disk entry");
            return;
        }
        index.touch(&path);

        self.cleanup_locked(&mut index, Some(&path)).await;
    }

    async fn clear(&self) {
        let mut index = self.index.lock().await;

        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(tier = %self.name, error = %e, "Failed to remove disk tier root"),
        }
        if let Err(e) = tokio::fs::create_dir_all(&self.root).await {
            warn!(tier = %self.name, error = %e, "Failed to recreate disk tier root");
        }
        index.clear();

        info!(tier = %self.name, root = %self.root.display(), "Disk tier cleared");
    }

    async fn clear_expired(&self) {
        let mut index = self.index.lock().await;

        let files = match self.scan().await {
            Ok(files) => files,
            Err(e) => {
                warn!(tier = %self.name, error = %e, "Failed to scan disk tier for expiry");
                return;
            }
        };

        let max_age = self.limits.read().max_age;
        let now = SystemTime::now();
        let mut removed = 0usize;
        for file in files {
            let age = now.duration_since(file.modified).unwrap_or(Duration::ZERO);
            if age <= max_age {
                continue;
            }
            match tokio::fs::remove_file(&file.path).await {
                Ok(()) => {
                    index.forget(&file.path);
                    removed += 1;
                }
                Err(e) => debug!(path = %file.path.display(), error = %e, "Failed to delete expired file"),
            }
        }

        if removed > 0 {
            info!(tier = %self.name, removed, "Removed expired disk entries");
        }
    }

    async fn size_bytes(&self) -> u64 {
        match self.scan().await {
            Ok(files) => files.iter().map(|f| f.size).sum(),
            Err(e) => {
                warn!(tier = %self.name, error = %e, "Failed to measure disk tier");
                0
            }
        }
    }

    async fn handle_event(&self, event: LifecycleEvent) {
        if event == LifecycleEvent::EnterBackground {
            self.clear_expired().await;
        }
    }
}

fn eviction_target(size_limit: u64) -> u64 {
    let (num, den) = EVICTION_TARGET;
    (size_limit as u128 * num as u128 / den as u128) as u64
}

/// Lists entry files under `root`. A missing root is an empty tier.
fn scan_entries(root: &Path) -> io::Result<Vec<EntryFile>> {
    let dir = match std::fs::read_dir(root) {
        Ok(dir) => dir,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut files = Vec::new();
    for item in dir {
        let item = item?;
        let path = item.path();
        if path.extension().is_some_and(|ext| ext == TEMP_EXTENSION) {
            continue;
        }
        // Entries can vanish between listing and stat
        let Ok(metadata) = item.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata.modified().unwrap_or(UNIX_EPOCH);
        let accessed = metadata.accessed().unwrap_or(modified);
        files.push(EntryFile {
            path,
            size: metadata.len(),
            modified,
            accessed,
        });
    }
    Ok(files)
}
