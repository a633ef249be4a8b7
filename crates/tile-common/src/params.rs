//! Tile rendering parameters.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Query parameters exactly as received; every field is optional text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRenderParams {
    pub color: Option<String>,
    pub min: Option<String>,
    pub max: Option<String>,
    pub opacity: Option<String>,
}

/// Values used when a parameter is absent or unusable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderDefaults {
    pub color: bool,
    pub min: f64,
    pub max: f64,
    pub opacity: f64,
}

impl Default for RenderDefaults {
    fn default() -> Self {
        Self {
            color: true,
            min: 0.1,
            max: 200.0,
            opacity: 0.7,
        }
    }
}

/// Validated rendering parameters. Always satisfies `min < max` and
/// `0 <= opacity <= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderParams {
    pub color: bool,
    pub min: f64,
    pub max: f64,
    pub opacity: f64,
}

impl RenderParams {
    /// Resolve raw query values against the defaults.
    ///
    /// Unparsable or non-finite values fall back to their default. When the
    /// resulting range is empty or inverted both bounds revert to the
    /// defaults.
    pub fn resolve(raw: &RawRenderParams, defaults: &RenderDefaults) -> Self {
        let color = raw
            .color
            .as_deref()
            .map(|v| parse_bool(v).unwrap_or(defaults.color))
            .unwrap_or(defaults.color);
        let mut min = parse_finite(raw.min.as_deref(), "min").unwrap_or(defaults.min);
        let mut max = parse_finite(raw.max.as_deref(), "max").unwrap_or(defaults.max);
        let opacity = parse_finite(raw.opacity.as_deref(), "opacity")
            .unwrap_or(defaults.opacity)
            .clamp(0.0, 1.0);

        if min >= max {
            warn!(min, max, "min must be below max, using default range");
            min = defaults.min;
            max = defaults.max;
        }

        Self {
            color,
            min,
            max,
            opacity,
        }
    }

    /// Parameters with every field at its default.
    pub fn from_defaults(defaults: &RenderDefaults) -> Self {
        Self::resolve(&RawRenderParams::default(), defaults)
    }

    /// `(name, value)` pairs that identify this rendering in a cache key.
    pub fn key_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("color", self.color.to_string()),
            ("min", self.min.to_string()),
            ("max", self.max.to_string()),
            ("opacity", self.opacity.to_string()),
        ]
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn parse_finite(value: Option<&str>, name: &str) -> Option<f64> {
    let value = value?;
    match value.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => {
            warn!(param = name, value, "ignoring unusable render parameter");
            None
        }
    }
}
