//! Application state and shared resources.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use raster_source::{open_dataset, sample_dataset_stats, DatasetMetadata, DatasetStats, RasterSource};
use storage::{DiskTileCache, MemoryTileCache, TileCache};
use tile_common::RenderDefaults;

use crate::blacklist::Blacklist;
use crate::config::{CacheBackend, ServiceConfig};
use crate::engine::TileEngine;

/// Shared application state, built once at startup and handed to every
/// handler.
pub struct AppState {
    pub config: ServiceConfig,
    pub engine: TileEngine,
    /// Stats sampled from the dataset at startup.
    pub stats: DatasetStats,
    /// Path of the dataset actually opened.
    pub dataset_path: String,
    pub used_fallback: bool,
}

impl AppState {
    /// Open the configured dataset (or its fallback) and build the engine.
    pub async fn new(config: ServiceConfig) -> Result<Self> {
        let raster = config.raster.clone();
        let opened = tokio::task::spawn_blocking(move || open_dataset(&raster))
            .await
            .context("dataset open task failed")?
            .context("no usable dataset")?;

        Self::from_source(config, opened.source, opened.path, opened.used_fallback).await
    }

    /// Build state around an already opened source.
    pub async fn from_source(
        config: ServiceConfig,
        source: Arc<dyn RasterSource>,
        dataset_path: String,
        used_fallback: bool,
    ) -> Result<Self> {
        let metadata = source.metadata();
        if metadata.crs != "EPSG:4326" {
            warn!(
                crs = %metadata.crs,
                "Dataset is not in EPSG:4326; tile bounds are geographic degrees"
            );
        }

        let stats = sample_dataset_stats(source.as_ref()).await;
        let defaults = RenderDefaults {
            color: true,
            min: stats.suggested_min,
            max: stats.suggested_max,
            opacity: config.default_opacity,
        };
        info!(
            path = %dataset_path,
            fallback = used_fallback,
            width = metadata.width,
            height = metadata.height,
            suggested_min = stats.suggested_min,
            suggested_max = stats.suggested_max,
            "Dataset ready"
        );

        let cache = build_cache(&config).await?;
        let blacklist = Arc::new(Blacklist::load(config.blacklist_path.as_deref())?);

        let engine = TileEngine::new(source, cache, blacklist, config.engine, defaults)
            .context("failed to prepare tile engine")?;

        Ok(Self {
            config,
            engine,
            stats,
            dataset_path,
            used_fallback,
        })
    }

    pub fn metadata(&self) -> &DatasetMetadata {
        self.engine.source().metadata()
    }
}

/// Create the configured tile cache backend.
pub async fn build_cache(config: &ServiceConfig) -> Result<Arc<dyn TileCache>> {
    let cache: Arc<dyn TileCache> = match config.cache_backend {
        CacheBackend::Disk => Arc::new(
            DiskTileCache::open(&config.cache_dir, config.cache_ttl)
                .await
                .with_context(|| format!("failed to open cache dir {}", config.cache_dir.display()))?,
        ),
        CacheBackend::Memory => {
            info!(max_mb = config.memory_cache_mb, "Using in-memory tile cache");
            Arc::new(MemoryTileCache::new(config.memory_cache_mb, config.cache_ttl))
        }
    };
    Ok(cache)
}
