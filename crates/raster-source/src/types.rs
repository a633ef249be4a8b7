//! Core types for raster access.

use serde::{Deserialize, Serialize};
use tile_common::{BoundingBox, GeoTransform, SampleBlock};

/// Static description of an opened dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    /// Path the dataset was opened from.
    pub path: String,

    /// Raster width in pixels.
    pub width: usize,

    /// Raster height in pixels.
    pub height: usize,

    /// Pixel-to-coordinate transform.
    pub transform: GeoTransform,

    /// Extent in dataset coordinates.
    pub bounds: BoundingBox,

    /// Coordinate reference system, e.g. "EPSG:4326".
    pub crs: String,

    /// Declared no-data value, if any.
    pub nodata: Option<f64>,

    /// Number of bands (samples per pixel).
    pub band_count: usize,

    /// Sample type name, e.g. "float32".
    pub dtype: String,

    /// Storage chunk shape (width, height) for strips or tiles.
    pub chunk_shape: (usize, usize),
}

impl DatasetMetadata {
    /// Metadata for a north-up raster with no file behind it.
    pub fn in_memory(width: usize, height: usize, transform: GeoTransform) -> Self {
        Self {
            path: "memory".to_string(),
            width,
            height,
            bounds: transform.bounds(width, height),
            transform,
            crs: "EPSG:4326".to_string(),
            nodata: None,
            band_count: 1,
            dtype: "float32".to_string(),
            chunk_shape: (width, height),
        }
    }
}

/// Outcome of a tolerant window read.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowRead {
    /// Samples for the requested window (possibly partially no-data).
    Data(SampleBlock),
    /// Nothing could be read for this window.
    NoData,
}

impl WindowRead {
    pub fn into_block(self) -> Option<SampleBlock> {
        match self {
            Self::Data(block) => Some(block),
            Self::NoData => None,
        }
    }
}

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ChunkCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub memory_bytes: u64,
    pub evictions: u64,
}

impl ChunkCacheStats {
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
