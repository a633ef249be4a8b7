//! Map tile service over a single large raster.
//!
//! The library exposes the engine and router so they can be driven from
//! tests without a socket.

pub mod blacklist;
pub mod cleanup;
pub mod config;
pub mod engine;
pub mod handlers;
pub mod inflight;
pub mod metrics;
pub mod state;

use axum::{extract::Extension, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

pub use blacklist::Blacklist;
pub use cleanup::{CleanupConfig, CleanupTask};
pub use config::{CacheBackend, ServiceConfig};
pub use engine::{EngineSettings, TileEngine, TileOutcome, TileResponse, TransparentReason};
pub use state::AppState;

/// Build the HTTP router. `/metrics` is only mounted when a Prometheus
/// handle is supplied.
pub fn build_router(state: Arc<AppState>, prometheus: Option<PrometheusHandle>) -> Router {
    let mut router = Router::new()
        .route("/tiles/:z/:x/:y", get(handlers::tile_handler))
        .route("/metadata", get(handlers::metadata_handler))
        .route("/health", get(handlers::health_handler));

    if let Some(handle) = prometheus {
        router = router
            .route("/metrics", get(handlers::metrics_handler))
            .layer(Extension(handle));
    }

    router
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}
