//! Mapping normalized intensities to RGBA pixels.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::normalize::NormalizedTile;

/// Default alpha floor for the color ramp.
pub const DEFAULT_MIN_OPACITY: u8 = 100;

/// How pixel alpha is derived from intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum AlphaPolicy {
    /// Ramp alpha is `min_opacity + v * (255 - min_opacity)`, so faint
    /// values stay visible, except `v == 0` (at or below `min`), which is
    /// fully transparent. Grayscale alpha is `v * 255`.
    FloorPlusRange { min_opacity: u8 },
    /// Ramp alpha is `v * opacity * 255`; grayscale alpha is `opacity * 255`.
    ProportionalOpacity,
}

impl Default for AlphaPolicy {
    fn default() -> Self {
        Self::FloorPlusRange {
            min_opacity: DEFAULT_MIN_OPACITY,
        }
    }
}

impl AlphaPolicy {
    /// Parse a policy name; `min_opacity` applies to `floor_plus_range`.
    pub fn parse(name: &str, min_opacity: u8) -> Result<Self, String> {
        match name.trim().to_lowercase().as_str() {
            "floor_plus_range" => Ok(Self::FloorPlusRange { min_opacity }),
            "proportional_opacity" => Ok(Self::ProportionalOpacity),
            other => Err(format!("unknown alpha policy '{}'", other)),
        }
    }
}

impl FromStr for AlphaPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, DEFAULT_MIN_OPACITY)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorizeOptions {
    /// Blue-cyan-yellow-red ramp when true, grayscale otherwise.
    pub color: bool,
    /// Opacity in [0, 1].
    pub opacity: f64,
    pub alpha_policy: AlphaPolicy,
}

/// RGB in [0, 1] on the blue -> cyan -> yellow -> red ramp.
pub fn ramp_color(v: f64) -> (f64, f64, f64) {
    let v = v.clamp(0.0, 1.0);
    if v < 0.25 {
        (0.0, 4.0 * v, 1.0)
    } else if v < 0.5 {
        let t = 4.0 * (v - 0.25);
        (t, 1.0, 1.0 - t)
    } else {
        (1.0, 1.0 - 2.0 * (v - 0.5), 0.0)
    }
}

#[inline]
fn to_byte(c: f64) -> u8 {
    (c * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Colorize a normalized tile into RGBA bytes (4 per pixel, row-major).
///
/// Invalid pixels are fully transparent black.
pub fn colorize(tile: &NormalizedTile, options: &ColorizeOptions) -> Vec<u8> {
    let opacity = options.opacity.clamp(0.0, 1.0);
    let mut rgba = vec![0u8; tile.values.len() * 4];

    for ((pixel, &v), &ok) in rgba.chunks_exact_mut(4).zip(&tile.values).zip(&tile.valid) {
        if !ok {
            continue;
        }
        let v = (v as f64).clamp(0.0, 1.0);

        let (r, g, b) = if options.color {
            ramp_color(v)
        } else {
            (v, v, v)
        };

        let alpha = match (options.alpha_policy, options.color) {
            (AlphaPolicy::FloorPlusRange { .. }, true) if v <= 0.0 => 0,
            (AlphaPolicy::FloorPlusRange { min_opacity }, true) => {
                let floor = min_opacity as f64;
                (floor + v * (255.0 - floor)).round().clamp(0.0, 255.0) as u8
            }
            (AlphaPolicy::FloorPlusRange { .. }, false) => to_byte(v),
            (AlphaPolicy::ProportionalOpacity, true) => to_byte(v * opacity),
            (AlphaPolicy::ProportionalOpacity, false) => to_byte(opacity),
        };

        pixel.copy_from_slice(&[to_byte(r), to_byte(g), to_byte(b), alpha]);
    }

    rgba
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(values: Vec<f32>) -> NormalizedTile {
        let valid = vec![true; values.len()];
        NormalizedTile {
            width: values.len(),
            height: 1,
            values,
            valid,
        }
    }

    fn opts(color: bool, policy: AlphaPolicy) -> ColorizeOptions {
        ColorizeOptions {
            color,
            opacity: 0.5,
            alpha_policy: policy,
        }
    }

    #[test]
    fn test_ramp_bands() {
        assert_eq!(ramp_color(0.0), (0.0, 0.0, 1.0));
        assert_eq!(ramp_color(0.125), (0.0, 0.5, 1.0));
        assert_eq!(ramp_color(0.25), (0.0, 1.0, 1.0));
        assert_eq!(ramp_color(0.375), (0.5, 1.0, 0.5));
        assert_eq!(ramp_color(0.5), (1.0, 1.0, 0.0));
        assert_eq!(ramp_color(0.75), (1.0, 0.5, 0.0));
        assert_eq!(ramp_color(1.0), (1.0, 0.0, 0.0));
    }

    #[test]
    fn test_floor_plus_range_alpha() {
        let rgba = colorize(&tile(vec![0.01, 1.0]), &opts(true, AlphaPolicy::default()));
        assert_eq!(&rgba[0..4], &[0, 10, 255, 102]);
        assert_eq!(&rgba[4..8], &[255, 0, 0, 255]);
    }

    #[test]
    fn test_floor_plus_range_hides_bottom_of_range() {
        let rgba = colorize(&tile(vec![0.0]), &opts(true, AlphaPolicy::default()));
        assert_eq!(rgba, vec![0, 0, 255, 0]);

        let rgba = colorize(
            &tile(vec![0.0]),
            &opts(true, AlphaPolicy::FloorPlusRange { min_opacity: 200 }),
        );
        assert_eq!(rgba[3], 0);
    }

    #[test]
    fn test_proportional_alpha() {
        let rgba = colorize(&tile(vec![1.0, 0.5]), &opts(true, AlphaPolicy::ProportionalOpacity));
        assert_eq!(rgba[3], 128); // 1.0 * 0.5 * 255 = 127.5
        assert_eq!(rgba[7], 64); // 0.5 * 0.5 * 255 = 63.75
    }

    #[test]
    fn test_grayscale() {
        let rgba = colorize(&tile(vec![0.5]), &opts(false, AlphaPolicy::default()));
        assert_eq!(rgba, vec![128, 128, 128, 128]);

        let rgba = colorize(&tile(vec![0.2]), &opts(false, AlphaPolicy::ProportionalOpacity));
        assert_eq!(rgba, vec![51, 51, 51, 128]);
    }

    #[test]
    fn test_invalid_pixels_transparent() {
        let mut t = tile(vec![0.8, 0.8]);
        t.valid[1] = false;
        for policy in [AlphaPolicy::default(), AlphaPolicy::ProportionalOpacity] {
            let rgba = colorize(&t, &opts(true, policy));
            assert!(rgba[3] > 0);
            assert_eq!(&rgba[4..8], &[0, 0, 0, 0]);
        }
    }

    #[test]
    fn test_parse_policy() {
        assert_eq!(
            AlphaPolicy::parse("floor_plus_range", 60).unwrap(),
            AlphaPolicy::FloorPlusRange { min_opacity: 60 }
        );
        assert_eq!(
            "PROPORTIONAL_OPACITY".parse::<AlphaPolicy>().unwrap(),
            AlphaPolicy::ProportionalOpacity
        );
        assert!("binary".parse::<AlphaPolicy>().is_err());
    }
}
