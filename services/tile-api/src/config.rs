//! Service configuration loaded from the environment.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use raster_source::RasterSourceConfig;
use renderer::{AlphaPolicy, DEFAULT_MIN_OPACITY};
use tile_common::FractionalZoomPolicy;

use crate::engine::EngineSettings;

/// Which tile cache backend to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Disk,
    Memory,
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "disk" => Ok(Self::Disk),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown cache backend '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub raster: RasterSourceConfig,

    pub cache_backend: CacheBackend,
    pub cache_dir: PathBuf,
    pub cache_ttl: Duration,
    pub memory_cache_mb: usize,

    pub engine: EngineSettings,
    /// Opacity used when a request does not specify one.
    pub default_opacity: f64,

    pub fractional_zoom: FractionalZoomPolicy,
    pub blacklist_path: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            raster: RasterSourceConfig::default(),
            cache_backend: CacheBackend::Disk,
            cache_dir: PathBuf::from("tile_cache"),
            cache_ttl: storage::DEFAULT_TTL,
            memory_cache_mb: 512,
            engine: EngineSettings::default(),
            default_opacity: 0.7,
            fractional_zoom: FractionalZoomPolicy::Round,
            blacklist_path: Some(PathBuf::from("config/blacklist.yaml")),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Unset or blank variables keep their defaults; values that are set but
    /// unparsable are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        config.raster = RasterSourceConfig::from_lookup(&get).map_err(anyhow::Error::msg)?;

        if let Some(backend) = get("CACHE_BACKEND") {
            config.cache_backend = backend
                .parse()
                .map_err(anyhow::Error::msg)
                .context("CACHE_BACKEND")?;
        }
        if let Some(dir) = get("CACHE_DIR") {
            config.cache_dir = PathBuf::from(dir);
        }
        let mut ttl_secs = config.cache_ttl.as_secs();
        parse_into(&get, "CACHE_TTL_SECS", &mut ttl_secs)?;
        config.cache_ttl = Duration::from_secs(ttl_secs);
        parse_into(&get, "MEMORY_CACHE_MB", &mut config.memory_cache_mb)?;

        parse_into(&get, "MAX_ZOOM", &mut config.engine.max_zoom)?;
        parse_into(&get, "MAX_WINDOW_PIXELS", &mut config.engine.max_window_pixels)?;
        parse_into(&get, "TILE_SIZE", &mut config.engine.tile_size)?;
        parse_into(&get, "LOG_SCALE", &mut config.engine.log_scale)?;
        parse_into(&get, "DEFAULT_OPACITY", &mut config.default_opacity)?;

        let mut min_opacity = DEFAULT_MIN_OPACITY;
        parse_into(&get, "MIN_OPACITY", &mut min_opacity)?;
        let policy = get("ALPHA_POLICY").unwrap_or_else(|| "floor_plus_range".to_string());
        config.engine.alpha_policy = AlphaPolicy::parse(&policy, min_opacity)
            .map_err(anyhow::Error::msg)
            .context("ALPHA_POLICY")?;

        if let Some(policy) = get("FRACTIONAL_ZOOM") {
            config.fractional_zoom = policy.parse().context("FRACTIONAL_ZOOM")?;
        }
        if let Some(path) = get("BLACKLIST_PATH") {
            config.blacklist_path = match path.trim().to_lowercase().as_str() {
                "none" | "off" => None,
                _ => Some(PathBuf::from(path)),
            };
        }

        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.raster.validate().map_err(anyhow::Error::msg)?;

        if self.cache_ttl.is_zero() {
            bail!("CACHE_TTL_SECS must be > 0");
        }
        if self.cache_backend == CacheBackend::Memory && self.memory_cache_mb == 0 {
            bail!("MEMORY_CACHE_MB must be > 0 for the memory cache");
        }
        if self.engine.tile_size < 2 || self.engine.tile_size > 4096 {
            bail!("TILE_SIZE must be between 2 and 4096, got {}", self.engine.tile_size);
        }
        if self.engine.max_window_pixels < 2 {
            bail!("MAX_WINDOW_PIXELS must be at least 2");
        }
        if !(0.0..=1.0).contains(&self.default_opacity) {
            bail!("DEFAULT_OPACITY must be within [0, 1], got {}", self.default_opacity);
        }

        Ok(())
    }
}

fn parse_into<T, G>(get: &G, name: &str, slot: &mut T) -> Result<()>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    if let Some(raw) = get(name) {
        *slot = raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{}={}: {}", name, raw, e))?;
    }
    Ok(())
}
