//! Raw sample blocks read from a raster window.

/// A 2-D block of samples plus a validity mask (row-major, top-to-bottom).
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBlock {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
    /// `false` marks no-data pixels.
    pub valid: Vec<bool>,
}

impl SampleBlock {
    /// Create a block where every sample is valid.
    pub fn new(width: usize, height: usize, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), width * height);
        let valid = vec![true; data.len()];
        Self {
            width,
            height,
            data,
            valid,
        }
    }

    /// Create a block, marking NaN and the declared no-data value as invalid.
    pub fn from_values(width: usize, height: usize, data: Vec<f32>, nodata: Option<f64>) -> Self {
        let valid = data
            .iter()
            .map(|v| !v.is_nan() && nodata.map_or(true, |nd| (*v as f64) != nd))
            .collect();
        Self {
            width,
            height,
            data,
            valid,
        }
    }

    /// Block with every pixel marked as no-data.
    pub fn nodata(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width * height],
            valid: vec![false; width * height],
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Value at (col, row) if it exists and is valid.
    pub fn get(&self, col: usize, row: usize) -> Option<f32> {
        if col >= self.width || row >= self.height {
            return None;
        }
        let idx = row * self.width + col;
        self.valid[idx].then(|| self.data[idx])
    }

    pub fn valid_count(&self) -> usize {
        self.valid.iter().filter(|v| **v).count()
    }

    /// Largest valid sample.
    pub fn max_valid(&self) -> Option<f32> {
        self.data
            .iter()
            .zip(&self.valid)
            .filter(|(_, ok)| **ok)
            .map(|(v, _)| *v)
            .fold(None, |acc, v| Some(acc.map_or(v, |m: f32| m.max(v))))
    }

    /// True when nothing in the block is worth drawing: no valid pixel, or
    /// every valid pixel is exactly zero.
    pub fn is_blank(&self) -> bool {
        !self
            .data
            .iter()
            .zip(&self.valid)
            .any(|(v, ok)| *ok && *v != 0.0)
    }

    /// Copy `other` into this block with its top-left at (row_off, col_off).
    ///
    /// Pixels falling outside this block are dropped.
    pub fn paste(&mut self, other: &SampleBlock, row_off: usize, col_off: usize) {
        for row in 0..other.height {
            let dst_row = row + row_off;
            if dst_row >= self.height {
                break;
            }
            for col in 0..other.width {
                let dst_col = col + col_off;
                if dst_col >= self.width {
                    break;
                }
                let src = row * other.width + col;
                let dst = dst_row * self.width + dst_col;
                self.data[dst] = other.data[src];
                self.valid[dst] = other.valid[src];
            }
        }
    }
}
