//! In-memory LRU tile cache.
//!
//! ## Memory-Based Eviction
//!
//! The cache is bounded by the total size of the stored PNGs rather than by
//! entry count. When an insert would push it over the limit it evicts ~5% of
//! the capacity (by memory) in one batch, oldest-used first.
//!
//! TTL follows the same rules as the disk cache: expired entries read as a
//! miss and stay resident until a sweep or LRU eviction removes them.

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::cache::{entry_age, is_fresh, CacheCounters};
use crate::{CacheKey, CacheStats, CachedTile, StorageResult, SweepStats, TileCache};

/// Source of the current time used to stamp new entries.
pub type Clock = Arc<dyn Fn() -> SystemTime + Send + Sync>;

// LruCache needs an entry bound; eviction is driven by bytes instead.
const LRU_CAPACITY: usize = 10_000_000;

pub struct MemoryTileCache {
    cache: Arc<RwLock<LruCache<String, CachedTile>>>,
    max_bytes: u64,
    ttl: Duration,
    clock: Clock,
    size_bytes: AtomicU64,
    entry_count: AtomicU64,
    counters: CacheCounters,
}

impl MemoryTileCache {
    /// Create a cache holding at most `max_size_mb` megabytes of tiles.
    pub fn new(max_size_mb: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(LRU_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Arc::new(RwLock::new(LruCache::new(capacity))),
            max_bytes: (max_size_mb as u64) * 1024 * 1024,
            ttl,
            clock: Arc::new(SystemTime::now),
            size_bytes: AtomicU64::new(0),
            entry_count: AtomicU64::new(0),
            counters: CacheCounters::default(),
        }
    }

    /// Replace the clock used for entry creation times.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.entry_count.load(Ordering::Relaxed) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict ~5% of capacity (by memory) in LRU order.
    ///
    /// Returns (entries_evicted, bytes_freed).
    fn evict_batch_locked(&self, cache: &mut LruCache<String, CachedTile>) -> (u64, u64) {
        let target_free = (self.max_bytes / 20).max(1);
        let mut bytes_freed = 0u64;
        let mut entries_evicted = 0u64;

        while bytes_freed < target_free {
            match cache.pop_lru() {
                Some((_, evicted)) => {
                    bytes_freed += evicted.data.len() as u64;
                    entries_evicted += 1;
                }
                None => break,
            }
        }

        self.size_bytes.fetch_sub(bytes_freed, Ordering::Relaxed);
        self.entry_count.fetch_sub(entries_evicted, Ordering::Relaxed);
        self.counters
            .evictions
            .fetch_add(entries_evicted, Ordering::Relaxed);

        info!(
            entries_evicted,
            bytes_freed_mb = format!("{:.2}", bytes_freed as f64 / (1024.0 * 1024.0)),
            cache_size_mb = format!("{:.2}", self.size_bytes() as f64 / (1024.0 * 1024.0)),
            max_size_mb = format!("{:.2}", self.max_bytes as f64 / (1024.0 * 1024.0)),
            "Memory tile cache batch eviction completed"
        );

        (entries_evicted, bytes_freed)
    }
}

#[async_trait]
impl TileCache for MemoryTileCache {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }

    async fn get_at(&self, key: &CacheKey, now: SystemTime) -> StorageResult<Option<CachedTile>> {
        // Write lock: a hit refreshes LRU order
        let mut cache = self.cache.write().await;
        match cache.get(key.as_str()) {
            Some(tile) if is_fresh(tile.created_at, now, self.ttl) => {
                self.counters.record_hit();
                Ok(Some(tile.clone()))
            }
            Some(_) => {
                self.counters.record_expired();
                Ok(None)
            }
            None => {
                self.counters.record_miss();
                Ok(None)
            }
        }
    }

    async fn put(&self, key: &CacheKey, data: Bytes) -> StorageResult<()> {
        let tile_size = data.len() as u64;
        if tile_size > self.max_bytes {
            debug!(key = %key, tile_size, "Tile larger than memory cache, not stored");
            return Ok(());
        }

        let mut cache = self.cache.write().await;

        if let Some(existing) = cache.pop(key.as_str()) {
            self.size_bytes
                .fetch_sub(existing.data.len() as u64, Ordering::Relaxed);
            self.entry_count.fetch_sub(1, Ordering::Relaxed);
        }

        while self.size_bytes() + tile_size > self.max_bytes && !cache.is_empty() {
            self.evict_batch_locked(&mut cache);
        }

        cache.put(key.as_str().to_string(), CachedTile::new(data, (self.clock)()));
        self.size_bytes.fetch_add(tile_size, Ordering::Relaxed);
        self.entry_count.fetch_add(1, Ordering::Relaxed);
        self.counters.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn sweep_at(&self, now: SystemTime) -> StorageResult<SweepStats> {
        let mut cache = self.cache.write().await;
        let mut stats = SweepStats {
            scanned: cache.len() as u64,
            ..Default::default()
        };

        let expired: Vec<String> = cache
            .iter()
            .filter(|(_, tile)| entry_age(tile.created_at, now) >= self.ttl)
            .map(|(k, _)| k.clone())
            .collect();

        for key in expired {
            if let Some(tile) = cache.pop(&key) {
                stats.removed += 1;
                stats.bytes_freed += tile.data.len() as u64;
            }
        }

        self.size_bytes.fetch_sub(stats.bytes_freed, Ordering::Relaxed);
        self.entry_count.fetch_sub(stats.removed, Ordering::Relaxed);
        self.counters.swept.fetch_add(stats.removed, Ordering::Relaxed);
        Ok(stats)
    }

    fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }
}
