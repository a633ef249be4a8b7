//! In-memory raster source.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tile_common::{GeoTransform, PixelWindow, SampleBlock};

use super::{check_window, RasterSource};
use crate::error::{RasterError, Result};
use crate::types::DatasetMetadata;

/// A raster held entirely in memory.
///
/// Regions can be marked corrupt so that any read touching them fails the
/// way a damaged strip in a file would.
pub struct MemorySource {
    metadata: DatasetMetadata,
    data: Vec<f32>,
    corrupt: Vec<PixelWindow>,
    reads: AtomicUsize,
}

impl MemorySource {
    /// Create a source from row-major samples.
    pub fn new(width: usize, height: usize, data: Vec<f32>, transform: GeoTransform) -> Result<Self> {
        if data.len() != width * height {
            return Err(RasterError::invalid_metadata(format!(
                "expected {} samples for {}x{}, got {}",
                width * height,
                width,
                height,
                data.len()
            )));
        }
        Ok(Self {
            metadata: DatasetMetadata::in_memory(width, height, transform),
            data,
            corrupt: Vec::new(),
            reads: AtomicUsize::new(0),
        })
    }

    /// Create a source where every sample is produced by `f(col, row)`.
    pub fn from_fn(
        width: usize,
        height: usize,
        transform: GeoTransform,
        f: impl Fn(usize, usize) -> f32,
    ) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for row in 0..height {
            for col in 0..width {
                data.push(f(col, row));
            }
        }
        Self {
            metadata: DatasetMetadata::in_memory(width, height, transform),
            data,
            corrupt: Vec::new(),
            reads: AtomicUsize::new(0),
        }
    }

    /// Declare the no-data value.
    pub fn with_nodata(mut self, nodata: f64) -> Self {
        self.metadata.nodata = Some(nodata);
        self
    }

    /// Make every read that intersects `region` fail.
    pub fn with_corrupt_region(mut self, region: PixelWindow) -> Self {
        self.corrupt.push(region);
        self
    }

    /// Number of `read_window` calls so far, failed ones included.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RasterSource for MemorySource {
    fn metadata(&self) -> &DatasetMetadata {
        &self.metadata
    }

    async fn read_window(&self, window: &PixelWindow) -> Result<SampleBlock> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        check_window(window, &self.metadata)?;

        if let Some(bad) = self.corrupt.iter().find(|bad| bad.intersects(window)) {
            return Err(RasterError::read_failed(format!(
                "corrupt region {:?} intersects {:?}",
                bad, window
            )));
        }

        let mut values = Vec::with_capacity(window.pixel_count());
        for row in window.row_off..window.row_end() {
            let start = row * self.metadata.width + window.col_off;
            values.extend_from_slice(&self.data[start..start + window.width]);
        }

        Ok(SampleBlock::from_values(
            window.width,
            window.height,
            values,
            self.metadata.nodata,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WindowRead;

    fn ramp(width: usize, height: usize) -> MemorySource {
        MemorySource::from_fn(
            width,
            height,
            GeoTransform::north_up(0.0, height as f64, 1.0, 1.0),
            |col, row| (row * width + col) as f32,
        )
    }

    #[tokio::test]
    async fn test_read_window() {
        let source = ramp(8, 6);
        let block = source.read_window(&PixelWindow::new(1, 2, 2, 3)).await.unwrap();
        assert_eq!(block.width, 3);
        assert_eq!(block.height, 2);
        assert_eq!(block.data, vec![10.0, 11.0, 12.0, 18.0, 19.0, 20.0]);
        assert_eq!(source.read_count(), 1);
    }

    #[tokio::test]
    async fn test_read_outside_fails() {
        let source = ramp(8, 6);
        assert!(source.read_window(&PixelWindow::new(5, 0, 2, 2)).await.is_err());
        assert!(source.read_window(&PixelWindow::new(0, 0, 0, 2)).await.is_err());
    }

    #[tokio::test]
    async fn test_nodata_is_masked() {
        let source = MemorySource::new(
            2,
            1,
            vec![-9999.0, 4.0],
            GeoTransform::north_up(0.0, 1.0, 1.0, 1.0),
        )
        .unwrap()
        .with_nodata(-9999.0);
        let block = source.read_window(&PixelWindow::new(0, 0, 1, 2)).await.unwrap();
        assert_eq!(block.valid, vec![false, true]);
    }

    #[test]
    fn test_new_checks_length() {
        let t = GeoTransform::north_up(0.0, 1.0, 1.0, 1.0);
        assert!(MemorySource::new(2, 2, vec![0.0; 3], t).is_err());
    }

    // =========================================================================
    // Tolerant reads
    // =========================================================================

    #[tokio::test]
    async fn test_tolerant_read_passes_through() {
        let source = ramp(40, 40);
        let window = PixelWindow::new(0, 0, 20, 20);
        let read = source.read_window_tolerant(&window).await;
        let block = read.into_block().unwrap();
        assert_eq!(block.valid_count(), 400);
        assert_eq!(source.read_count(), 1);
    }

    #[tokio::test]
    async fn test_tolerant_read_salvages_center() {
        // Corruption on the window's edge only
        let source = ramp(40, 40).with_corrupt_region(PixelWindow::new(0, 0, 2, 2));
        let window = PixelWindow::new(0, 0, 20, 20);

        let block = match source.read_window_tolerant(&window).await {
            WindowRead::Data(block) => block,
            WindowRead::NoData => panic!("expected salvaged data"),
        };

        assert_eq!((block.width, block.height), (20, 20));
        assert_eq!(block.valid_count(), 100);
        // Outer ring is no-data, center came from rows/cols 5..15
        assert_eq!(block.get(0, 0), None);
        assert_eq!(block.get(5, 5), Some((5 * 40 + 5) as f32));
        assert_eq!(block.get(14, 14), Some((14 * 40 + 14) as f32));
        assert_eq!(block.get(15, 15), None);
        assert_eq!(source.read_count(), 2);
    }

    #[tokio::test]
    async fn test_tolerant_read_gives_up_on_center_corruption() {
        let source = ramp(40, 40).with_corrupt_region(PixelWindow::new(10, 10, 1, 1));
        let read = source.read_window_tolerant(&PixelWindow::new(0, 0, 20, 20)).await;
        assert_eq!(read, WindowRead::NoData);
        assert_eq!(source.read_count(), 2);
    }

    #[tokio::test]
    async fn test_tolerant_read_small_window_not_retried() {
        let source = ramp(40, 40).with_corrupt_region(PixelWindow::new(0, 0, 1, 1));
        let read = source.read_window_tolerant(&PixelWindow::new(0, 0, 10, 30)).await;
        assert_eq!(read, WindowRead::NoData);
        assert_eq!(source.read_count(), 1);
    }
}
