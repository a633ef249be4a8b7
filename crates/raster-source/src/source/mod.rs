//! Raster source trait and implementations.

mod geotiff;
mod memory;

pub use geotiff::GeoTiffSource;
pub use memory::MemorySource;

use async_trait::async_trait;
use tile_common::{PixelWindow, SampleBlock};
use tracing::{debug, warn};

use crate::error::{RasterError, Result};
use crate::types::{ChunkCacheStats, DatasetMetadata, WindowRead};

/// Windows at or below this side length are not worth a shrunken retry.
pub const MIN_RETRY_SIDE: usize = 10;

/// Windowed access to a single-band raster.
///
/// Implementations must be safe to share between concurrent tile requests.
#[async_trait]
pub trait RasterSource: Send + Sync {
    /// Get metadata about the dataset.
    fn metadata(&self) -> &DatasetMetadata;

    /// Read the samples of a pixel window.
    ///
    /// The window must lie inside the raster. Any decode failure fails the
    /// whole read.
    async fn read_window(&self, window: &PixelWindow) -> Result<SampleBlock>;

    /// Read a window, salvaging what can be read when the full read fails.
    ///
    /// On failure the centered half-size window is tried once and pasted
    /// into a no-data block of the original shape, so corruption at the
    /// edge of a window still leaves its middle drawable.
    async fn read_window_tolerant(&self, window: &PixelWindow) -> WindowRead {
        let first_error = match self.read_window(window).await {
            Ok(block) => return WindowRead::Data(block),
            Err(e) => e,
        };

        if window.width <= MIN_RETRY_SIDE || window.height <= MIN_RETRY_SIDE {
            warn!(
                window = ?window,
                error = %first_error,
                "Window read failed and is too small to retry"
            );
            return WindowRead::NoData;
        }

        let inner = window.shrink_centered();
        debug!(
            window = ?window,
            retry = ?inner,
            error = %first_error,
            "Window read failed, retrying centered half window"
        );

        match self.read_window(&inner).await {
            Ok(partial) => {
                let mut block = SampleBlock::nodata(window.width, window.height);
                block.paste(
                    &partial,
                    inner.row_off - window.row_off,
                    inner.col_off - window.col_off,
                );
                WindowRead::Data(block)
            }
            Err(e) => {
                warn!(window = ?window, error = %e, "Retry read failed, treating window as no data");
                WindowRead::NoData
            }
        }
    }

    /// Chunk cache statistics, when the source keeps a cache.
    fn cache_stats(&self) -> ChunkCacheStats {
        ChunkCacheStats::default()
    }
}

/// Reject windows that are empty or reach past the raster edge.
pub(crate) fn check_window(window: &PixelWindow, metadata: &DatasetMetadata) -> Result<()> {
    if window.is_empty()
        || window.row_end() > metadata.height
        || window.col_end() > metadata.width
    {
        return Err(RasterError::out_of_bounds(
            format!("{:?}", window),
            format!("{}x{}", metadata.width, metadata.height),
        ));
    }
    Ok(())
}
