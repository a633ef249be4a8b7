//! Web Mercator (XYZ) tile coordinates and tile-to-geographic conversion.

use std::f64::consts::PI;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{BoundingBox, TileError, TileResult};

/// Highest zoom a coordinate may carry before `2^z` stops fitting in a u32.
pub const MAX_ZOOM_LEVEL: u32 = 30;

/// Latitude limit of the Web Mercator projection.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

/// A tile coordinate (z/x/y).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    /// Zoom level
    pub z: u32,
    /// Column (x)
    pub x: u32,
    /// Row (y), counted from the north edge
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: u32, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Number of tiles along each axis at this zoom.
    pub fn matrix_size(&self) -> u64 {
        1u64 << self.z.min(MAX_ZOOM_LEVEL)
    }

    /// Check `0 <= x, y < 2^z`.
    pub fn validate(&self) -> TileResult<()> {
        if self.z > MAX_ZOOM_LEVEL {
            return Err(TileError::InvalidTile(format!(
                "zoom {} exceeds {}",
                self.z, MAX_ZOOM_LEVEL
            )));
        }
        let n = self.matrix_size();
        if self.x as u64 >= n || self.y as u64 >= n {
            return Err(TileError::InvalidTile(format!(
                "{}/{}/{} outside the {}x{} tile matrix",
                self.z, self.x, self.y, n, n
            )));
        }
        Ok(())
    }

    /// Generate a cache key string.
    pub fn cache_key(&self) -> String {
        format!("{}_{}_{}", self.z, self.x, self.y)
    }
}

impl std::fmt::Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Convert lat/lon to Web Mercator tile coordinates.
pub fn latlon_to_tile(lat: f64, lon: f64, zoom: u32) -> TileCoord {
    let n = (1u64 << zoom.min(MAX_ZOOM_LEVEL)) as f64;
    let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);

    let x = ((lon + 180.0) / 360.0 * n).floor().clamp(0.0, n - 1.0) as u32;
    let lat_rad = lat.to_radians();
    let y = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n)
        .floor()
        .clamp(0.0, n - 1.0) as u32;

    TileCoord { z: zoom, x, y }
}

/// Convert Web Mercator tile coordinates to lat/lon bounds.
///
/// Longitude is linear in x; latitude of the top edge is the inverse
/// Gudermannian of row y and the bottom edge that of row y + 1.
pub fn tile_to_bbox(coord: &TileCoord) -> BoundingBox {
    let n = coord.matrix_size() as f64;

    let lon_min = coord.x as f64 / n * 360.0 - 180.0;
    let lon_max = (coord.x as f64 + 1.0) / n * 360.0 - 180.0;

    let lat_max = row_to_lat(coord.y as f64, n);
    let lat_min = row_to_lat(coord.y as f64 + 1.0, n);

    BoundingBox::new(lon_min, lat_min, lon_max, lat_max)
}

fn row_to_lat(row: f64, n: f64) -> f64 {
    (PI * (1.0 - 2.0 * row / n)).sinh().atan().to_degrees()
}

/// What to do with a zoom segment like `6.5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FractionalZoomPolicy {
    /// Round to the nearest integer zoom.
    #[default]
    Round,
    /// Treat as a malformed coordinate.
    Reject,
}

impl FromStr for FractionalZoomPolicy {
    type Err = TileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "round" => Ok(Self::Round),
            "reject" => Ok(Self::Reject),
            other => Err(TileError::ConfigError(format!(
                "unknown fractional zoom policy '{}'",
                other
            ))),
        }
    }
}

/// A zoom level parsed from a URL segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedZoom {
    pub zoom: u32,
    /// The fractional input when rounding took place.
    pub rounded_from: Option<f64>,
}

/// Parse a zoom path segment, applying the fractional zoom policy.
pub fn parse_zoom(raw: &str, policy: FractionalZoomPolicy) -> TileResult<ParsedZoom> {
    let raw = raw.trim();
    if let Ok(zoom) = raw.parse::<u32>() {
        return Ok(ParsedZoom {
            zoom,
            rounded_from: None,
        });
    }

    let value: f64 = raw
        .parse()
        .map_err(|_| TileError::InvalidTile(format!("zoom '{}' is not a number", raw)))?;
    if !value.is_finite() || value < 0.0 {
        return Err(TileError::InvalidTile(format!(
            "zoom '{}' must be a non-negative number",
            raw
        )));
    }

    match policy {
        FractionalZoomPolicy::Reject => Err(TileError::InvalidTile(format!(
            "fractional zoom '{}' is not supported",
            raw
        ))),
        FractionalZoomPolicy::Round => {
            let rounded = value.round();
            if rounded > MAX_ZOOM_LEVEL as f64 {
                return Err(TileError::InvalidTile(format!(
                    "zoom {} exceeds {}",
                    rounded, MAX_ZOOM_LEVEL
                )));
            }
            Ok(ParsedZoom {
                zoom: rounded as u32,
                rounded_from: Some(value),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Tile bounds
    // =========================================================================

    #[test]
    fn test_zoom0_covers_mercator_world() {
        let bbox = tile_to_bbox(&TileCoord::new(0, 0, 0));
        assert!((bbox.min_x + 180.0).abs() < 1e-9);
        assert!((bbox.max_x - 180.0).abs() < 1e-9);
        assert!((bbox.max_y - MAX_MERCATOR_LAT).abs() < 1e-6);
        assert!((bbox.min_y + MAX_MERCATOR_LAT).abs() < 1e-6);
    }

    #[test]
    fn test_zoom1_quadrants() {
        let nw = tile_to_bbox(&TileCoord::new(1, 0, 0));
        assert!((nw.min_x + 180.0).abs() < 1e-9);
        assert!(nw.max_x.abs() < 1e-9);
        assert!(nw.min_y.abs() < 1e-9);

        let se = tile_to_bbox(&TileCoord::new(1, 1, 1));
        assert!(se.min_x.abs() < 1e-9);
        assert!(se.max_y.abs() < 1e-9);
        assert!(se.min_y < -85.0);
    }

    #[test]
    fn test_adjacent_tiles_share_edges() {
        let a = tile_to_bbox(&TileCoord::new(6, 18, 40));
        let right = tile_to_bbox(&TileCoord::new(6, 19, 40));
        let below = tile_to_bbox(&TileCoord::new(6, 18, 41));
        assert_eq!(a.max_x, right.min_x);
        assert_eq!(a.min_y, below.max_y);
    }

    #[test]
    fn test_latlon_to_tile() {
        let coord = latlon_to_tile(0.0, 0.0, 0);
        assert_eq!(coord, TileCoord { z: 0, x: 0, y: 0 });

        let coord = latlon_to_tile(40.7128, -74.0060, 10); // NYC
        assert_eq!(coord, TileCoord { z: 10, x: 301, y: 384 });

        // Poles and antimeridian clamp into the matrix
        let coord = latlon_to_tile(90.0, 180.0, 3);
        assert_eq!(coord, TileCoord { z: 3, x: 7, y: 0 });
    }

    #[test]
    fn test_validate() {
        assert!(TileCoord::new(0, 0, 0).validate().is_ok());
        assert!(TileCoord::new(3, 7, 7).validate().is_ok());
        assert!(TileCoord::new(3, 8, 0).validate().is_err());
        assert!(TileCoord::new(3, 0, 8).validate().is_err());
        assert!(TileCoord::new(31, 0, 0).validate().is_err());
    }

    #[test]
    fn test_cache_key_and_display() {
        let coord = TileCoord::new(6, 19, 42);
        assert_eq!(coord.cache_key(), "6_19_42");
        assert_eq!(coord.to_string(), "6/19/42");
    }

    // =========================================================================
    // Zoom parsing
    // =========================================================================

    #[test]
    fn test_parse_integer_zoom() {
        let parsed = parse_zoom("7", FractionalZoomPolicy::Reject).unwrap();
        assert_eq!(parsed.zoom, 7);
        assert_eq!(parsed.rounded_from, None);
    }

    #[test]
    fn test_parse_fractional_zoom_rounds() {
        let parsed = parse_zoom("6.5", FractionalZoomPolicy::Round).unwrap();
        assert_eq!(parsed.zoom, 7);
        assert_eq!(parsed.rounded_from, Some(6.5));

        let parsed = parse_zoom("6.4", FractionalZoomPolicy::Round).unwrap();
        assert_eq!(parsed.zoom, 6);
    }

    #[test]
    fn test_parse_fractional_zoom_rejected() {
        let err = parse_zoom("6.5", FractionalZoomPolicy::Reject).unwrap_err();
        assert!(matches!(err, TileError::InvalidTile(_)));
    }

    #[test]
    fn test_parse_bad_zoom() {
        assert!(parse_zoom("abc", FractionalZoomPolicy::Round).is_err());
        assert!(parse_zoom("-1", FractionalZoomPolicy::Round).is_err());
        assert!(parse_zoom("NaN", FractionalZoomPolicy::Round).is_err());
        assert!(parse_zoom("40.2", FractionalZoomPolicy::Round).is_err());
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!(
            "ROUND".parse::<FractionalZoomPolicy>().unwrap(),
            FractionalZoomPolicy::Round
        );
        assert_eq!(
            "reject".parse::<FractionalZoomPolicy>().unwrap(),
            FractionalZoomPolicy::Reject
        );
        assert!("truncate".parse::<FractionalZoomPolicy>().is_err());
    }
}
