//! Health checks and Prometheus metrics.

use axum::{
    extract::Extension,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

use storage::CacheStats;

use crate::state::AppState;

// ============================================================================
// Health Checks
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub dataset: String,
    pub fallback: bool,
    pub cache_backend: &'static str,
    pub cache: CacheStats,
}

/// GET /health
pub async fn health_handler(Extension(state): Extension<Arc<AppState>>) -> Json<HealthResponse> {
    let cache = state.engine.cache();
    Json(HealthResponse {
        status: "ok",
        dataset: state.dataset_path.clone(),
        fallback: state.used_fallback,
        cache_backend: cache.backend(),
        cache: cache.stats(),
    })
}

// ============================================================================
// Prometheus Metrics
// ============================================================================

/// GET /metrics - Prometheus metrics endpoint
#[instrument(skip(state, handle))]
pub async fn metrics_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(handle): Extension<PrometheusHandle>,
) -> Response {
    crate::metrics::publish_cache_gauges(
        &state.engine.cache().stats(),
        &state.engine.source().cache_stats(),
    );

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    )
        .into_response()
}
