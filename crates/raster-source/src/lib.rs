//! Windowed access to a large single-band GeoTIFF.
//!
//! Tile requests only ever touch a small window of the raster, so the file is
//! opened once and each read decodes just the strips or tiles the window
//! overlaps.
//!
//! # Architecture
//!
//! ```text
//! Tile request
//!      │
//!      ▼
//! RasterSource::read_window_tolerant(window)
//!      │
//!      ├─► read_window(window)
//!      │         │
//!      │         ├─► chunk in ChunkCache: reuse decoded samples
//!      │         └─► otherwise: decode strip/tile (blocking task)
//!      │
//!      ├─► failure: retry centered half window, pad with no-data
//!      │
//!      └─► WindowRead::Data(block) | WindowRead::NoData
//! ```
//!
//! # Example
//!
//! ```ignore
//! use raster_source::{open_dataset, RasterSourceConfig};
//!
//! let config = RasterSourceConfig::from_lookup(|name| std::env::var(name).ok())?;
//! let opened = open_dataset(&config)?;
//! let window = PixelWindow::new(0, 0, 256, 256);
//! let block = opened.source.read_window(&window).await?;
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod factory;
pub mod source;
pub mod stats;
pub mod types;

pub use cache::{ChunkCache, DecodedChunk};
pub use config::RasterSourceConfig;
pub use error::{RasterError, Result};
pub use factory::{open_dataset, OpenedDataset};
pub use source::{GeoTiffSource, MemorySource, RasterSource};
pub use stats::{compute_sample_stats, sample_dataset_stats, DatasetStats};
pub use types::{ChunkCacheStats, DatasetMetadata, WindowRead};
