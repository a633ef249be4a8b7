//! The render chain: resample -> normalize -> colorize -> encode.

use serde::{Deserialize, Serialize};
use tile_common::{RenderParams, SampleBlock};
use tracing::debug;

use crate::colorize::{colorize, AlphaPolicy, ColorizeOptions};
use crate::error::RenderResult;
use crate::normalize::{normalize, NormalizeOptions};
use crate::png::encode_png;
use crate::resample::resample_block;

/// Default output tile edge in pixels.
pub const DEFAULT_TILE_SIZE: usize = 256;

/// Everything needed to turn a sample block into a tile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderSettings {
    pub tile_size: usize,
    pub normalize: NormalizeOptions,
    pub colorize: ColorizeOptions,
}

impl RenderSettings {
    pub fn new(params: &RenderParams, tile_size: usize, log_scale: bool, alpha_policy: AlphaPolicy) -> Self {
        Self {
            tile_size,
            normalize: NormalizeOptions {
                min: params.min,
                max: params.max,
                log_scale,
            },
            colorize: ColorizeOptions {
                color: params.color,
                opacity: params.opacity,
                alpha_policy,
            },
        }
    }
}

/// Render a block into PNG bytes.
///
/// Returns `Ok(None)` when there is nothing to draw: the block is smaller
/// than 2x2 or holds no non-zero valid sample.
pub fn render_block(block: &SampleBlock, settings: &RenderSettings) -> RenderResult<Option<Vec<u8>>> {
    if block.is_blank() {
        debug!(width = block.width, height = block.height, "Blank block, nothing to render");
        return Ok(None);
    }

    let Some(resampled) = resample_block(block, settings.tile_size, settings.tile_size) else {
        debug!(width = block.width, height = block.height, "Block too small to resample");
        return Ok(None);
    };

    let normalized = normalize(&resampled, &settings.normalize);
    let rgba = colorize(&normalized, &settings.colorize);
    let png = encode_png(&rgba, settings.tile_size, settings.tile_size)?;

    Ok(Some(png))
}
