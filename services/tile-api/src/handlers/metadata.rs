//! `GET /metadata`

use axum::{extract::Extension, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

use raster_source::DatasetStats;

use crate::state::AppState;

/// Dataset description plus the statistics sampled at startup.
#[derive(Debug, Serialize)]
pub struct MetadataResponse {
    /// `[min_x, min_y, max_x, max_y]` in dataset coordinates.
    pub bounds: [f64; 4],
    pub crs: String,
    pub width: usize,
    pub height: usize,
    /// Band count.
    pub count: usize,
    pub dtype: String,
    pub nodata: Option<f64>,
    #[serde(flatten)]
    pub stats: DatasetStats,
    pub max_zoom: u32,
    pub tile_size: usize,
    /// True when the primary dataset could not be opened.
    pub fallback: bool,
}

impl MetadataResponse {
    pub fn from_state(state: &AppState) -> Self {
        let metadata = state.metadata();
        let settings = state.engine.settings();
        Self {
            bounds: metadata.bounds.to_array(),
            crs: metadata.crs.clone(),
            width: metadata.width,
            height: metadata.height,
            count: metadata.band_count,
            dtype: metadata.dtype.clone(),
            nodata: metadata.nodata,
            stats: state.stats.clone(),
            max_zoom: settings.max_zoom,
            tile_size: settings.tile_size,
            fallback: state.used_fallback,
        }
    }
}

#[instrument(skip(state))]
pub async fn metadata_handler(Extension(state): Extension<Arc<AppState>>) -> Json<MetadataResponse> {
    Json(MetadataResponse::from_state(&state))
}
