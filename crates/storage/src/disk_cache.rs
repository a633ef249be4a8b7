//! File-system tile cache.
//!
//! Each tile lives in `<dir>/<sha256(key)>.png`. The file's modification
//! time is the entry's creation time. Writes go to a uniquely named
//! temporary file in the same directory and are renamed into place, so a
//! concurrent reader never observes a partially written PNG.

use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::{entry_age, is_fresh, CacheCounters};
use crate::{CacheKey, CacheStats, CachedTile, StorageResult, SweepStats, TileCache};

const TILE_EXTENSION: &str = "png";
const TEMP_EXTENSION: &str = "tmp";

/// Temporary files older than this are leftovers from interrupted writes.
pub const STALE_TEMP_AGE: Duration = Duration::from_secs(15 * 60);

pub struct DiskTileCache {
    dir: PathBuf,
    ttl: Duration,
    counters: CacheCounters,
}

impl DiskTileCache {
    /// Open (creating if needed) a cache rooted at `dir`.
    pub async fn open(dir: impl Into<PathBuf>, ttl: Duration) -> StorageResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        info!(dir = %dir.display(), ttl_secs = ttl.as_secs(), "Disk tile cache ready");
        Ok(Self {
            dir,
            ttl,
            counters: CacheCounters::default(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `key`.
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir
            .join(format!("{}.{}", key.digest(), TILE_EXTENSION))
    }

    fn temp_path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!(
            ".{}.{}.{}",
            key.digest(),
            Uuid::new_v4().simple(),
            TEMP_EXTENSION
        ))
    }

    async fn write_atomic(&self, key: &CacheKey, data: &[u8]) -> std::io::Result<()> {
        let tmp = self.temp_path_for(key);
        if let Err(e) = tokio::fs::write(&tmp, data).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }
        if let Err(e) = tokio::fs::rename(&tmp, self.path_for(key)).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }
        Ok(())
    }
}

enum EntryKind {
    Tile,
    Temp,
    Other,
}

fn classify(name: &str) -> EntryKind {
    if name.starts_with('.') && name.ends_with(&format!(".{}", TEMP_EXTENSION)) {
        EntryKind::Temp
    } else if !name.starts_with('.') && name.ends_with(&format!(".{}", TILE_EXTENSION)) {
        EntryKind::Tile
    } else {
        EntryKind::Other
    }
}

#[async_trait]
impl TileCache for DiskTileCache {
    fn backend(&self) -> &'static str {
        "disk"
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }

    async fn get_at(&self, key: &CacheKey, now: SystemTime) -> StorageResult<Option<CachedTile>> {
        let path = self.path_for(key);

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.counters.record_miss();
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let created_at = metadata.modified()?;

        if !is_fresh(created_at, now, self.ttl) {
            debug!(key = %key, "Cached tile expired");
            self.counters.record_expired();
            return Ok(None);
        }

        match tokio::fs::read(&path).await {
            Ok(data) => {
                self.counters.record_hit();
                Ok(Some(CachedTile::new(Bytes::from(data), created_at)))
            }
            // Swept between stat and read
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.counters.record_miss();
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &CacheKey, data: Bytes) -> StorageResult<()> {
        match self.write_atomic(key, &data).await {
            Ok(()) => {
                self.counters.writes.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, bytes = data.len(), "Cached tile on disk");
                Ok(())
            }
            Err(e) => {
                self.counters.write_errors.fetch_add(1, Ordering::Relaxed);
                Err(e.into())
            }
        }
    }

    async fn sweep_at(&self, now: SystemTime) -> StorageResult<SweepStats> {
        let mut stats = SweepStats::default();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let kind = classify(name);
            if matches!(kind, EntryKind::Other) {
                continue;
            }
            stats.scanned += 1;

            let metadata = match entry.metadata().await {
                Ok(m) => m,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => {
                    warn!(file = name, error = %e, "Failed to stat cache entry");
                    stats.errors += 1;
                    continue;
                }
            };
            let Ok(modified) = metadata.modified() else {
                stats.errors += 1;
                continue;
            };
            let age = entry_age(modified, now);

            let limit = match kind {
                EntryKind::Tile => self.ttl,
                _ => STALE_TEMP_AGE,
            };
            if age < limit {
                continue;
            }

            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => match kind {
                    EntryKind::Tile => {
                        stats.removed += 1;
                        stats.bytes_freed += metadata.len();
                    }
                    _ => stats.temp_removed += 1,
                },
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(file = name, error = %e, "Failed to delete expired cache entry");
                    stats.errors += 1;
                }
            }
        }

        self.counters
            .swept
            .fetch_add(stats.removed, Ordering::Relaxed);
        Ok(stats)
    }

    fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }
}
