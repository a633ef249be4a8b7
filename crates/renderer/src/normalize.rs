//! Scaling raw samples into [0, 1].

use serde::{Deserialize, Serialize};
use tile_common::SampleBlock;

/// Value range and transform used for normalization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizeOptions {
    pub min: f64,
    pub max: f64,
    /// Apply `ln(1 + v)` to the data and both bounds before scaling.
    pub log_scale: bool,
}

/// Normalized intensities in [0, 1] plus the validity mask.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTile {
    pub width: usize,
    pub height: usize,
    pub values: Vec<f32>,
    pub valid: Vec<bool>,
}

impl NormalizedTile {
    pub fn valid_count(&self) -> usize {
        self.valid.iter().filter(|v| **v).count()
    }
}

/// Normalize a block.
///
/// In log mode samples `<= 0` become 0 and are marked invalid. Values are
/// clipped to the (transformed) bounds and rescaled; an empty or inverted
/// range scales by 1.
pub fn normalize(block: &SampleBlock, options: &NormalizeOptions) -> NormalizedTile {
    let (lo, hi) = if options.log_scale {
        (
            if options.min > 0.0 { options.min.ln_1p() } else { 0.0 },
            if options.max > 0.0 { options.max.ln_1p() } else { 0.0 },
        )
    } else {
        (options.min, options.max)
    };
    let range = hi - lo;
    let denom = if range > 0.0 { range } else { 1.0 };

    let mut values = Vec::with_capacity(block.len());
    let mut valid = Vec::with_capacity(block.len());

    for (&raw, &ok) in block.data.iter().zip(&block.valid) {
        let raw = raw as f64;
        if !ok || raw.is_nan() || (options.log_scale && raw <= 0.0) {
            values.push(0.0);
            valid.push(false);
            continue;
        }

        let v = if options.log_scale { raw.ln_1p() } else { raw };
        let clipped = v.max(lo).min(hi);
        values.push(((clipped - lo) / denom).clamp(0.0, 1.0) as f32);
        valid.push(true);
    }

    NormalizedTile {
        width: block.width,
        height: block.height,
        values,
        valid,
    }
}
