//! Configuration for dataset access.

use serde::{Deserialize, Serialize};

/// Where to find the dataset and how much memory reads may keep around.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RasterSourceConfig {
    /// Path of the dataset to open first.
    pub primary_path: String,

    /// Path tried when the primary dataset cannot be opened.
    pub fallback_path: Option<String>,

    /// Memory budget for decoded chunks in megabytes.
    pub chunk_cache_size_mb: usize,
}

impl Default for RasterSourceConfig {
    fn default() -> Self {
        Self {
            primary_path: "data/density.tif".to_string(),
            fallback_path: None,
            chunk_cache_size_mb: 256,
        }
    }
}

impl RasterSourceConfig {
    /// Load the dataset settings through a variable lookup
    /// (`RASTER_PATH`, `RASTER_FALLBACK_PATH`, `RASTER_CHUNK_CACHE_MB`).
    ///
    /// Unset or blank variables keep their defaults; a cache size that is
    /// set but not a number is an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(path) = get("RASTER_PATH") {
            config.primary_path = path;
        }
        config.fallback_path = get("RASTER_FALLBACK_PATH");

        if let Some(raw) = get("RASTER_CHUNK_CACHE_MB") {
            config.chunk_cache_size_mb = raw
                .trim()
                .parse()
                .map_err(|e| format!("RASTER_CHUNK_CACHE_MB={}: {}", raw, e))?;
        }

        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.primary_path.trim().is_empty() {
            return Err("primary_path must not be empty".to_string());
        }

        if self.chunk_cache_size_mb == 0 {
            return Err("chunk_cache_size_mb must be > 0".to_string());
        }

        Ok(())
    }

    /// Get the chunk cache size in bytes.
    pub fn chunk_cache_size_bytes(&self) -> usize {
        self.chunk_cache_size_mb * 1024 * 1024
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |name| {
            pairs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_from_lookup() {
        let config = RasterSourceConfig::from_lookup(vars(&[
            ("RASTER_PATH", "/data/a.tif"),
            ("RASTER_FALLBACK_PATH", "/data/b.tif"),
            ("RASTER_CHUNK_CACHE_MB", "64"),
        ]))
        .unwrap();
        assert_eq!(config.primary_path, "/data/a.tif");
        assert_eq!(config.fallback_path.as_deref(), Some("/data/b.tif"));
        assert_eq!(config.chunk_cache_size_mb, 64);
    }

    #[test]
    fn test_from_lookup_blank_and_bad_values() {
        let config = RasterSourceConfig::from_lookup(vars(&[
            ("RASTER_PATH", " "),
            ("RASTER_FALLBACK_PATH", ""),
        ]))
        .unwrap();
        assert_eq!(config.primary_path, "data/density.tif");
        assert!(config.fallback_path.is_none());

        assert!(RasterSourceConfig::from_lookup(vars(&[("RASTER_CHUNK_CACHE_MB", "lots")])).is_err());
    }

    #[test]
    fn test_default_is_valid() {
        assert!(RasterSourceConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty() {
        let config = RasterSourceConfig {
            primary_path: " ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RasterSourceConfig {
            chunk_cache_size_mb: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cache_size_bytes() {
        let config = RasterSourceConfig {
            chunk_cache_size_mb: 2,
            ..Default::default()
        };
        assert_eq!(config.chunk_cache_size_bytes(), 2 * 1024 * 1024);
    }
}
