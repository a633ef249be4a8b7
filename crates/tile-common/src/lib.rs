//! Common types and utilities shared across the raster tile services.

pub mod bbox;
pub mod block;
pub mod error;
pub mod params;
pub mod tile;
pub mod window;

pub use bbox::BoundingBox;
pub use block::SampleBlock;
pub use error::{TileError, TileResult};
pub use params::{RawRenderParams, RenderDefaults, RenderParams};
pub use tile::{
    latlon_to_tile, parse_zoom, tile_to_bbox, FractionalZoomPolicy, ParsedZoom, TileCoord, MAX_MERCATOR_LAT,
    MAX_ZOOM_LEVEL,
};
pub use window::{bbox_to_window, GeoTransform, PixelWindow};
