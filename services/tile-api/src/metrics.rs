//! Prometheus metrics.
//!
//! Counters and histograms are recorded through the `metrics` facade and
//! rendered by the Prometheus exporter at `/metrics`. Without an installed
//! recorder (tests, library use) every call is a no-op.

use anyhow::{Context, Result};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

use raster_source::ChunkCacheStats;
use storage::{CacheStats, SweepStats};

use crate::engine::TileOutcome;

/// Install the global Prometheus recorder.
pub fn install_recorder() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")
}

pub fn record_tile_outcome(outcome: &TileOutcome) {
    counter!("tile_requests_total", "outcome" => outcome.label()).increment(1);
}

pub fn record_render_duration(elapsed: Duration) {
    histogram!("tile_render_duration_seconds").record(elapsed.as_secs_f64());
}

pub fn record_cache_write_error() {
    counter!("tile_cache_write_errors_total").increment(1);
}

pub fn record_sweep(stats: &SweepStats, elapsed: Duration) {
    counter!("tile_cache_swept_total").increment(stats.removed);
    counter!("tile_cache_sweep_errors_total").increment(stats.errors);
    histogram!("tile_cache_sweep_duration_seconds").record(elapsed.as_secs_f64());
}

/// Publish point-in-time cache figures as gauges; called before each scrape.
pub fn publish_cache_gauges(tiles: &CacheStats, chunks: &ChunkCacheStats) {
    gauge!("tile_cache_hits").set(tiles.hits as f64);
    gauge!("tile_cache_misses").set(tiles.misses as f64);
    gauge!("tile_cache_expired").set(tiles.expired as f64);
    gauge!("tile_cache_hit_rate_percent").set(tiles.hit_rate());

    gauge!("chunk_cache_entries").set(chunks.entries as f64);
    gauge!("chunk_cache_bytes").set(chunks.memory_bytes as f64);
    gauge!("chunk_cache_hits").set(chunks.hits as f64);
    gauge!("chunk_cache_misses").set(chunks.misses as f64);
    gauge!("chunk_cache_evictions").set(chunks.evictions as f64);
}
