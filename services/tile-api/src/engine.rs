//! Tile orchestration.
//!
//! A request moves through these stages:
//!
//! ```text
//! blacklist ─► zoom limit ─► cache ─► (single flight) ─► geometry
//!     ─► window read ─► resample/normalize/colorize/encode ─► cache store
//! ```
//!
//! Any stage that cannot produce data ends the request with the canonical
//! transparent tile. Nothing in here returns an error to the caller.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Instant, SystemTime};
use tracing::{debug, error, info, instrument, warn};

use raster_source::{RasterSource, WindowRead};
use renderer::{render_block, transparent_tile, AlphaPolicy, RenderResult, RenderSettings, DEFAULT_TILE_SIZE};
use storage::{content_etag, CacheKey, TileCache};
use tile_common::{bbox_to_window, tile_to_bbox, PixelWindow, RawRenderParams, RenderDefaults, RenderParams, TileCoord};

use crate::blacklist::Blacklist;
use crate::inflight::InFlight;
use crate::metrics;

/// Knobs that bound and shape rendering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Requests above this zoom get a transparent tile.
    pub max_zoom: u32,
    /// Largest window side, in source pixels, that will be read.
    pub max_window_pixels: usize,
    pub tile_size: usize,
    /// Apply `ln(1 + v)` before scaling.
    pub log_scale: bool,
    pub alpha_policy: AlphaPolicy,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_zoom: 11,
            max_window_pixels: 1000,
            tile_size: DEFAULT_TILE_SIZE,
            log_scale: true,
            alpha_policy: AlphaPolicy::default(),
        }
    }
}

/// Why a transparent tile was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransparentReason {
    Blacklisted,
    ZoomTooHigh,
    OutsideDataset,
    WindowTooLarge,
    ReadFailed,
    EmptyBlock,
    RenderFailed,
}

impl TransparentReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blacklisted => "blacklisted",
            Self::ZoomTooHigh => "zoom_too_high",
            Self::OutsideDataset => "outside_dataset",
            Self::WindowTooLarge => "window_too_large",
            Self::ReadFailed => "read_failed",
            Self::EmptyBlock => "empty_block",
            Self::RenderFailed => "render_failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileOutcome {
    /// Served from the tile cache.
    Cached { created_at: SystemTime },
    /// Rendered for this request.
    Rendered { created_at: SystemTime },
    Transparent(TransparentReason),
}

impl TileOutcome {
    /// Where the bytes came from: `cache`, `rendered` or `transparent`.
    pub fn source(&self) -> &'static str {
        match self {
            Self::Cached { .. } => "cache",
            Self::Rendered { .. } => "rendered",
            Self::Transparent(_) => "transparent",
        }
    }

    /// Metric label: the source, or the transparent reason.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Transparent(reason) => reason.as_str(),
            other => other.source(),
        }
    }

    pub fn created_at(&self) -> Option<SystemTime> {
        match self {
            Self::Cached { created_at } | Self::Rendered { created_at } => Some(*created_at),
            Self::Transparent(_) => None,
        }
    }
}

/// PNG bytes plus how they were obtained.
#[derive(Debug, Clone)]
pub struct TileResponse {
    pub body: Bytes,
    pub outcome: TileOutcome,
}

impl TileResponse {
    pub fn is_transparent(&self) -> bool {
        matches!(self.outcome, TileOutcome::Transparent(_))
    }

    /// Validator for real tiles. Transparent tiles are never validated so
    /// clients re-ask once the underlying problem is fixed.
    pub fn etag(&self) -> Option<String> {
        (!self.is_transparent()).then(|| content_etag(&self.body))
    }
}

/// Turns tile requests into PNG bytes.
pub struct TileEngine {
    source: Arc<dyn RasterSource>,
    cache: Arc<dyn TileCache>,
    blacklist: Arc<Blacklist>,
    settings: EngineSettings,
    defaults: RenderDefaults,
    inflight: InFlight<TileResponse>,
    transparent: Bytes,
}

impl TileEngine {
    pub fn new(
        source: Arc<dyn RasterSource>,
        cache: Arc<dyn TileCache>,
        blacklist: Arc<Blacklist>,
        settings: EngineSettings,
        defaults: RenderDefaults,
    ) -> RenderResult<Self> {
        let transparent = Bytes::from(transparent_tile(settings.tile_size)?);
        Ok(Self {
            source,
            cache,
            blacklist,
            settings,
            defaults,
            inflight: InFlight::new(),
            transparent,
        })
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn defaults(&self) -> &RenderDefaults {
        &self.defaults
    }

    pub fn source(&self) -> &Arc<dyn RasterSource> {
        &self.source
    }

    pub fn cache(&self) -> &Arc<dyn TileCache> {
        &self.cache
    }

    /// The canonical fully transparent tile.
    pub fn transparent_png(&self) -> Bytes {
        self.transparent.clone()
    }

    pub fn resolve_params(&self, raw: &RawRenderParams) -> RenderParams {
        RenderParams::resolve(raw, &self.defaults)
    }

    pub fn cache_key(&self, coord: TileCoord, params: &RenderParams) -> CacheKey {
        CacheKey::new(coord, params.key_params())
    }

    /// Pixel window of the dataset covered by a tile, if any.
    pub fn locate(&self, coord: TileCoord) -> Option<PixelWindow> {
        coord.validate().ok()?;
        let metadata = self.source.metadata();
        bbox_to_window(
            &tile_to_bbox(&coord),
            &metadata.transform,
            metadata.height,
            metadata.width,
        )
    }

    /// Produce the tile for `coord`. Never fails: every problem degrades to
    /// the transparent tile.
    #[instrument(skip(self, raw), fields(z = coord.z, x = coord.x, y = coord.y))]
    pub async fn get_tile(&self, coord: TileCoord, raw: &RawRenderParams) -> TileResponse {
        let started = Instant::now();
        let response = self.resolve(coord, raw).await;

        metrics::record_tile_outcome(&response.outcome);
        debug!(
            outcome = response.outcome.label(),
            bytes = response.body.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Tile served"
        );
        response
    }

    async fn resolve(&self, coord: TileCoord, raw: &RawRenderParams) -> TileResponse {
        if self.blacklist.contains(&coord) {
            info!("Blacklisted tile requested");
            return self.transparent_response(TransparentReason::Blacklisted);
        }
        if coord.z > self.settings.max_zoom {
            debug!(max_zoom = self.settings.max_zoom, "Zoom above limit");
            return self.transparent_response(TransparentReason::ZoomTooHigh);
        }

        let params = self.resolve_params(raw);
        let key = self.cache_key(coord, &params);

        match self.cache.get(&key).await {
            Ok(Some(hit)) => {
                return TileResponse {
                    body: hit.data,
                    outcome: TileOutcome::Cached {
                        created_at: hit.created_at,
                    },
                }
            }
            Ok(None) => {}
            Err(e) => warn!(key = %key, error = %e, "Tile cache read failed, rendering"),
        }

        self.inflight
            .run(key.as_str(), || self.render_and_store(coord, params, &key))
            .await
    }

    async fn render_and_store(&self, coord: TileCoord, params: RenderParams, key: &CacheKey) -> TileResponse {
        let Some(window) = self.locate(coord) else {
            debug!("Tile does not overlap the dataset");
            return self.transparent_response(TransparentReason::OutsideDataset);
        };

        let limit = self.settings.max_window_pixels;
        if window.width > limit || window.height > limit {
            info!(
                width = window.width,
                height = window.height,
                limit,
                "Window too large to read"
            );
            return self.transparent_response(TransparentReason::WindowTooLarge);
        }

        let block = match self.source.read_window_tolerant(&window).await {
            WindowRead::Data(block) => block,
            WindowRead::NoData => return self.transparent_response(TransparentReason::ReadFailed),
        };

        let settings = RenderSettings::new(
            &params,
            self.settings.tile_size,
            self.settings.log_scale,
            self.settings.alpha_policy,
        );
        let started = Instant::now();
        let rendered = tokio::task::spawn_blocking(move || render_block(&block, &settings)).await;
        metrics::record_render_duration(started.elapsed());

        let png = match rendered {
            Ok(Ok(Some(png))) => Bytes::from(png),
            Ok(Ok(None)) => return self.transparent_response(TransparentReason::EmptyBlock),
            Ok(Err(e)) => {
                warn!(error = %e, "Tile rendering failed");
                return self.transparent_response(TransparentReason::RenderFailed);
            }
            Err(e) => {
                error!(error = %e, "Render task panicked or was cancelled");
                return self.transparent_response(TransparentReason::RenderFailed);
            }
        };

        if let Err(e) = self.cache.put(key, png.clone()).await {
            warn!(key = %key, error = %e, "Failed to cache tile, serving uncached");
            metrics::record_cache_write_error();
        }

        TileResponse {
            body: png,
            outcome: TileOutcome::Rendered {
                created_at: SystemTime::now(),
            },
        }
    }

    fn transparent_response(&self, reason: TransparentReason) -> TileResponse {
        TileResponse {
            body: self.transparent.clone(),
            outcome: TileOutcome::Transparent(reason),
        }
    }
}
