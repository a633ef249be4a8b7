//! Tile cache abstraction shared by the disk and memory backends.
//!
//! Entries carry their creation time. An entry whose age has reached the
//! configured TTL is treated as absent on read and left in place until the
//! next sweep removes it.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use crate::{CacheKey, StorageResult};

/// Default time-to-live for cached tiles (7 days).
pub const DEFAULT_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

/// A cached tile and when it was stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedTile {
    pub data: Bytes,
    pub created_at: SystemTime,
}

impl CachedTile {
    pub fn new(data: Bytes, created_at: SystemTime) -> Self {
        Self { data, created_at }
    }

    /// Age relative to `now`. A creation time in the future counts as zero.
    pub fn age(&self, now: SystemTime) -> Duration {
        entry_age(self.created_at, now)
    }

    pub fn etag(&self) -> String {
        content_etag(&self.data)
    }
}

/// Strong HTTP validator for a tile body: the first 16 hex digits of its
/// SHA-256, quoted.
///
/// Rendering is deterministic, so a tile served straight from the renderer
/// and the same tile served later from any cache share a validator.
pub fn content_etag(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    format!("\"{}\"", hex::encode(&digest[..8]))
}

pub(crate) fn entry_age(created_at: SystemTime, now: SystemTime) -> Duration {
    now.duration_since(created_at).unwrap_or(Duration::ZERO)
}

/// Whether an entry created at `created_at` is still served at `now`.
pub fn is_fresh(created_at: SystemTime, now: SystemTime, ttl: Duration) -> bool {
    entry_age(created_at, now) < ttl
}

/// Persistent tile cache.
///
/// Implementations must tolerate concurrent reads and writes of the same
/// key: a reader sees either the previous complete entry, the new complete
/// entry, or nothing.
#[async_trait]
pub trait TileCache: Send + Sync {
    /// Short backend name for logs and the health endpoint.
    fn backend(&self) -> &'static str;

    fn ttl(&self) -> Duration;

    /// Look up a tile as of `now`. Expired entries read as `None`.
    async fn get_at(&self, key: &CacheKey, now: SystemTime) -> StorageResult<Option<CachedTile>>;

    async fn get(&self, key: &CacheKey) -> StorageResult<Option<CachedTile>> {
        self.get_at(key, SystemTime::now()).await
    }

    /// Store a tile, replacing any existing entry for the key.
    async fn put(&self, key: &CacheKey, data: Bytes) -> StorageResult<()>;

    /// Remove entries whose age at `now` has reached the TTL.
    async fn sweep_at(&self, now: SystemTime) -> StorageResult<SweepStats>;

    async fn sweep(&self) -> StorageResult<SweepStats> {
        self.sweep_at(SystemTime::now()).await
    }

    fn stats(&self) -> CacheStats;
}

/// Result of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepStats {
    pub scanned: u64,
    pub removed: u64,
    pub bytes_freed: u64,
    /// Leftover partial writes that were cleaned up.
    pub temp_removed: u64,
    /// Entries that could not be inspected or deleted.
    pub errors: u64,
}

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Misses caused by an entry older than the TTL.
    pub expired: u64,
    pub writes: u64,
    pub write_errors: u64,
    pub evictions: u64,
    pub swept: u64,
}

impl CacheStats {
    /// Hit rate as a percentage.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Lock-free counters behind [`CacheStats`].
#[derive(Debug, Default)]
pub(crate) struct CacheCounters {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub expired: AtomicU64,
    pub writes: AtomicU64,
    pub write_errors: AtomicU64,
    pub evictions: AtomicU64,
    pub swept: AtomicU64,
}

impl CacheCounters {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_expired(&self) {
        self.expired.fetch_add(1, Ordering::Relaxed);
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            swept: self.swept.load(Ordering::Relaxed),
        }
    }
}
