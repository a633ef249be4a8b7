//! Rendered tile caching.
//!
//! Two interchangeable backends implement [`TileCache`]:
//! - [`DiskTileCache`]: one PNG per key under a cache directory, shared by
//!   every server process pointed at it
//! - [`MemoryTileCache`]: byte-bounded in-process LRU

pub mod cache;
pub mod disk_cache;
pub mod error;
pub mod key;
pub mod memory_cache;

pub use cache::{content_etag, is_fresh, CacheStats, CachedTile, SweepStats, TileCache, DEFAULT_TTL};
pub use disk_cache::{DiskTileCache, STALE_TEMP_AGE};
pub use error::{StorageError, StorageResult};
pub use key::CacheKey;
pub use memory_cache::{Clock, MemoryTileCache};
