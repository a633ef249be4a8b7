//! Affine geo-transforms and raster pixel windows.

use serde::{Deserialize, Serialize};

use crate::BoundingBox;

/// Affine mapping from pixel (col, row) to dataset coordinates.
///
/// Coefficients follow the GDAL ordering:
/// `x = origin_x + col * pixel_width + row * row_rotation`
/// `y = origin_y + col * col_rotation + row * pixel_height`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub row_rotation: f64,
    pub origin_y: f64,
    pub col_rotation: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Build from the six GDAL coefficients.
    pub fn from_gdal(c: [f64; 6]) -> Self {
        Self {
            origin_x: c[0],
            pixel_width: c[1],
            row_rotation: c[2],
            origin_y: c[3],
            col_rotation: c[4],
            pixel_height: c[5],
        }
    }

    /// North-up transform with the top-left corner at (origin_x, origin_y).
    ///
    /// `pixel_height` is given as a positive size; rows grow southwards.
    pub fn north_up(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            pixel_width,
            row_rotation: 0.0,
            origin_y,
            col_rotation: 0.0,
            pixel_height: -pixel_height,
        }
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.row_rotation,
            self.origin_y,
            self.col_rotation,
            self.pixel_height,
        ]
    }

    /// Pixel (col, row) to coordinates.
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width + row * self.row_rotation,
            self.origin_y + col * self.col_rotation + row * self.pixel_height,
        )
    }

    /// Coordinates to fractional pixel (col, row).
    ///
    /// Returns `None` for a degenerate (non-invertible) transform.
    pub fn invert(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let det = self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation;
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let dx = x - self.origin_x;
        let dy = y - self.origin_y;
        let col = (dx * self.pixel_height - dy * self.row_rotation) / det;
        let row = (dy * self.pixel_width - dx * self.col_rotation) / det;
        Some((col, row))
    }

    /// Extent covered by a `width` x `height` raster.
    pub fn bounds(&self, width: usize, height: usize) -> BoundingBox {
        let (w, h) = (width as f64, height as f64);
        let corners = [
            self.apply(0.0, 0.0),
            self.apply(w, 0.0),
            self.apply(0.0, h),
            self.apply(w, h),
        ];
        // Four corners are always present.
        BoundingBox::from_points(&corners).unwrap_or(BoundingBox::new(0.0, 0.0, 0.0, 0.0))
    }
}

/// Rectangle in raster pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelWindow {
    pub row_off: usize,
    pub col_off: usize,
    pub height: usize,
    pub width: usize,
}

impl PixelWindow {
    pub fn new(row_off: usize, col_off: usize, height: usize, width: usize) -> Self {
        Self {
            row_off,
            col_off,
            height,
            width,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// One past the last row.
    pub fn row_end(&self) -> usize {
        self.row_off + self.height
    }

    /// One past the last column.
    pub fn col_end(&self) -> usize {
        self.col_off + self.width
    }

    /// Fractional (col, row) of the window center.
    pub fn center(&self) -> (f64, f64) {
        (
            self.col_off as f64 + self.width as f64 / 2.0,
            self.row_off as f64 + self.height as f64 / 2.0,
        )
    }

    /// Intersect with `[0, height) x [0, width)`.
    pub fn clamp_to(&self, height: usize, width: usize) -> PixelWindow {
        let row_off = self.row_off.min(height);
        let col_off = self.col_off.min(width);
        PixelWindow {
            row_off,
            col_off,
            height: self.row_end().min(height) - row_off,
            width: self.col_end().min(width) - col_off,
        }
    }

    /// Whether two windows share at least one pixel.
    pub fn intersects(&self, other: &PixelWindow) -> bool {
        self.row_off < other.row_end()
            && other.row_off < self.row_end()
            && self.col_off < other.col_end()
            && other.col_off < self.col_end()
    }

    /// Half-size window centered inside this one.
    pub fn shrink_centered(&self) -> PixelWindow {
        PixelWindow {
            row_off: self.row_off + self.height / 4,
            col_off: self.col_off + self.width / 4,
            height: self.height / 2,
            width: self.width / 2,
        }
    }
}

/// Map a bounding box onto the raster grid.
///
/// Every bbox corner is inverted through the transform and the min/max over
/// the corners is floored/ceiled, so axis order and rotation cannot produce
/// an inverted window. The result is clamped to the raster. `None` means the
/// bbox has no pixels in this raster.
pub fn bbox_to_window(
    bbox: &BoundingBox,
    transform: &GeoTransform,
    height: usize,
    width: usize,
) -> Option<PixelWindow> {
    if !bbox.intersects(&transform.bounds(width, height)) {
        return None;
    }

    let corners = [
        (bbox.min_x, bbox.min_y),
        (bbox.min_x, bbox.max_y),
        (bbox.max_x, bbox.min_y),
        (bbox.max_x, bbox.max_y),
    ];
    let mut pixels = Vec::with_capacity(4);
    for (x, y) in corners {
        pixels.push(transform.invert(x, y)?);
    }
    let extent = BoundingBox::from_points(&pixels)?;

    let col_min = extent.min_x.floor().max(0.0);
    let row_min = extent.min_y.floor().max(0.0);
    let col_max = extent.max_x.ceil().min(width as f64);
    let row_max = extent.max_y.ceil().min(height as f64);

    if !(col_max > col_min && row_max > row_min) {
        return None;
    }

    let window = PixelWindow::new(
        row_min as usize,
        col_min as usize,
        (row_max - row_min) as usize,
        (col_max - col_min) as usize,
    );
    (!window.is_empty()).then_some(window)
}
