//! LRU cache for decoded strips and tiles.

use lru::LruCache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::types::ChunkCacheStats;

/// Band-1 samples of one strip or tile, cropped to the raster edge.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedChunk {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

impl DecodedChunk {
    fn size_bytes(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }
}

/// Decoded chunks keyed by chunk index.
///
/// Entries are bounded by total bytes rather than count; chunk sizes vary
/// between strip and tile layouts.
pub struct ChunkCache {
    cache: LruCache<u32, Arc<DecodedChunk>>,
    memory_limit: usize,
    current_memory: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl ChunkCache {
    /// Create a new chunk cache with the given memory limit in bytes.
    pub fn new(memory_limit: usize) -> Self {
        Self {
            cache: LruCache::unbounded(),
            memory_limit,
            current_memory: 0,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Look up a chunk, counting the hit or miss.
    pub fn get(&mut self, index: u32) -> Option<Arc<DecodedChunk>> {
        if let Some(data) = self.cache.get(&index) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            Some(Arc::clone(data))
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    /// Insert a chunk, evicting least recently used chunks to make room.
    ///
    /// A chunk larger than the whole budget is not cached.
    pub fn insert(&mut self, index: u32, data: Arc<DecodedChunk>) {
        let data_size = data.size_bytes();
        if data_size > self.memory_limit {
            return;
        }

        if let Some(old) = self.cache.pop(&index) {
            self.current_memory = self.current_memory.saturating_sub(old.size_bytes());
        }

        while self.current_memory + data_size > self.memory_limit && !self.cache.is_empty() {
            if let Some((_, evicted)) = self.cache.pop_lru() {
                self.current_memory = self.current_memory.saturating_sub(evicted.size_bytes());
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }

        self.cache.put(index, data);
        self.current_memory += data_size;
    }

    pub fn stats(&self) -> ChunkCacheStats {
        ChunkCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.cache.len(),
            memory_bytes: self.current_memory as u64,
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    pub fn clear(&mut self) {
        self.cache.clear();
        self.current_memory = 0;
    }

    pub fn memory_usage(&self) -> usize {
        self.current_memory
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
