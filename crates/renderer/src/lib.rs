//! Turning raster sample blocks into PNG map tiles.
//!
//! Every stage is a pure function over data owned by one request, so
//! rendering never takes a lock:
//! - [`resample`]: Catmull-Rom bicubic resampling to the tile size
//! - [`normalize`]: optional `ln(1 + v)`, clip, rescale to [0, 1]
//! - [`colorize`]: color ramp or grayscale, with a configurable alpha policy
//! - [`png`]: indexed/RGBA PNG encoding

pub mod colorize;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod png;
pub mod resample;

pub use colorize::{colorize, ramp_color, AlphaPolicy, ColorizeOptions, DEFAULT_MIN_OPACITY};
pub use error::{RenderError, RenderResult};
pub use normalize::{normalize, NormalizeOptions, NormalizedTile};
pub use pipeline::{render_block, RenderSettings, DEFAULT_TILE_SIZE};
pub use png::{encode_png, transparent_tile};
pub use resample::resample_block;
