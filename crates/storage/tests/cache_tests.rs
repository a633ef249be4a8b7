//! Integration tests for the disk tile cache.

use bytes::Bytes;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use storage::{CacheKey, DiskTileCache, TileCache};
use tile_common::TileCoord;

const HOUR: Duration = Duration::from_secs(3600);

fn key(z: u32, x: u32, y: u32) -> CacheKey {
    CacheKey::new(
        TileCoord::new(z, x, y),
        [("color", "true"), ("min", "0.1"), ("max", "200"), ("opacity", "0.7")],
    )
}

async fn open(dir: &std::path::Path, ttl: Duration) -> DiskTileCache {
    DiskTileCache::open(dir.join("tile_cache"), ttl).await.unwrap()
}

// ============================================================================
// Reads and writes
// ============================================================================

#[tokio::test]
async fn test_open_creates_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = open(tmp.path(), HOUR).await;
    assert!(cache.dir().is_dir());
}

#[tokio::test]
async fn test_put_then_get() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = open(tmp.path(), HOUR).await;
    let k = key(6, 19, 40);

    assert!(cache.get(&k).await.unwrap().is_none());
    cache.put(&k, Bytes::from_static(b"\x89PNG fake")).await.unwrap();

    let tile = cache.get(&k).await.unwrap().unwrap();
    assert_eq!(tile.data.as_ref(), b"\x89PNG fake");
    assert!(cache.path_for(&k).exists());

    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.writes, 1);
}

#[tokio::test]
async fn test_file_name_is_key_digest() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = open(tmp.path(), HOUR).await;
    let k = key(3, 1, 2);
    cache.put(&k, Bytes::from_static(b"x")).await.unwrap();

    let name = cache.path_for(&k).file_name().unwrap().to_string_lossy().to_string();
    assert_eq!(name, format!("{}.png", k.digest()));
}

#[tokio::test]
async fn test_param_order_hits_same_entry() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = open(tmp.path(), HOUR).await;
    let coord = TileCoord::new(4, 3, 5);

    let written = CacheKey::new(coord, [("max", "150"), ("min", "1")]);
    let read = CacheKey::new(coord, [("min", "1"), ("max", "150")]);
    cache.put(&written, Bytes::from_static(b"tile")).await.unwrap();
    assert!(cache.get(&read).await.unwrap().is_some());
}

#[tokio::test]
async fn test_put_replaces_existing() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = open(tmp.path(), HOUR).await;
    let k = key(2, 1, 1);
    cache.put(&k, Bytes::from_static(b"first")).await.unwrap();
    cache.put(&k, Bytes::from_static(b"second")).await.unwrap();
    assert_eq!(cache.get(&k).await.unwrap().unwrap().data.as_ref(), b"second");
}

// ============================================================================
// TTL
// ============================================================================

#[tokio::test]
async fn test_ttl_boundary() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = open(tmp.path(), HOUR).await;
    let k = key(6, 20, 41);
    cache.put(&k, Bytes::from_static(b"tile")).await.unwrap();
    let created = cache.get(&k).await.unwrap().unwrap().created_at;

    let at_59 = created + Duration::from_secs(59 * 60);
    assert!(cache.get_at(&k, at_59).await.unwrap().is_some());

    let at_61 = created + Duration::from_secs(61 * 60);
    assert!(cache.get_at(&k, at_61).await.unwrap().is_none());
    assert_eq!(cache.stats().expired, 1);

    // Expired entries are left for the sweeper
    assert!(cache.path_for(&k).exists());
}

// ============================================================================
// Sweep
// ============================================================================

#[tokio::test]
async fn test_sweep_removes_expired_tiles() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = open(tmp.path(), HOUR).await;
    for x in 0..3 {
        cache.put(&key(5, x, 0), Bytes::from_static(b"abcd")).await.unwrap();
    }

    // Nothing has aged yet
    let stats = cache.sweep().await.unwrap();
    assert_eq!(stats.removed, 0);
    assert_eq!(stats.scanned, 3);

    let later = SystemTime::now() + 2 * HOUR;
    let stats = cache.sweep_at(later).await.unwrap();
    assert_eq!(stats.removed, 3);
    assert_eq!(stats.bytes_freed, 12);
    assert_eq!(cache.stats().swept, 3);
    assert!(cache.get(&key(5, 0, 0)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_sweep_cleans_stale_temp_files_and_ignores_others() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = open(tmp.path(), 24 * HOUR).await;

    let leftover = cache.dir().join(".deadbeef.0123456789abcdef.tmp");
    std::fs::write(&leftover, b"partial").unwrap();
    let unrelated = cache.dir().join("README.txt");
    std::fs::write(&unrelated, b"keep me").unwrap();

    let stats = cache.sweep_at(SystemTime::now() + HOUR).await.unwrap();
    assert_eq!(stats.temp_removed, 1);
    assert!(!leftover.exists());
    assert!(unrelated.exists());
}

// ============================================================================
// Concurrency and failures
// ============================================================================

#[tokio::test]
async fn test_concurrent_writes_same_key() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = Arc::new(open(tmp.path(), HOUR).await);
    let k = key(7, 40, 50);

    let mut handles = Vec::new();
    for i in 0..16u8 {
        let cache = cache.clone();
        let k = k.clone();
        handles.push(tokio::spawn(async move {
            cache.put(&k, Bytes::from(vec![i; 4096])).await.unwrap();
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    // Whatever won, the file holds one complete payload
    let tile = cache.get(&k).await.unwrap().unwrap();
    assert_eq!(tile.data.len(), 4096);
    assert!(tile.data.iter().all(|b| *b == tile.data[0]));

    let leftovers = std::fs::read_dir(cache.dir())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn test_write_failure_is_reported() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = open(tmp.path(), HOUR).await;
    std::fs::remove_dir_all(cache.dir()).unwrap();

    let result = cache.put(&key(1, 0, 0), Bytes::from_static(b"tile")).await;
    assert!(result.is_err());
    assert_eq!(cache.stats().write_errors, 1);
    assert_eq!(cache.stats().writes, 0);
}
