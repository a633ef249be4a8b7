//! Caches for decoded raster chunks.

mod chunk_cache;

pub use chunk_cache::{ChunkCache, DecodedChunk};
