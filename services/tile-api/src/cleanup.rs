//! Periodic tile cache sweep.
//!
//! Expired tiles are already invisible to readers; this task reclaims the
//! space they occupy on a fixed interval.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use storage::{StorageResult, SweepStats, TileCache};

use crate::metrics;

/// Configuration for the sweep task.
#[derive(Debug, Clone)]
pub struct CleanupConfig {
    /// Whether sweeping is enabled
    pub enabled: bool,
    /// How often to sweep (in seconds)
    pub interval_secs: u64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 3600, // Run every hour
        }
    }
}

impl CleanupConfig {
    /// Load sweep configuration from environment.
    pub fn from_env() -> Self {
        let enabled = std::env::var("ENABLE_CACHE_SWEEP")
            .ok()
            .map(|v| v.to_lowercase() == "true" || v == "1")
            .unwrap_or(true); // Enabled by default

        let interval_secs = std::env::var("CACHE_SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(3600);

        Self {
            enabled,
            interval_secs,
        }
    }
}

/// Background cache sweep.
pub struct CleanupTask {
    cache: Arc<dyn TileCache>,
    config: CleanupConfig,
}

impl CleanupTask {
    pub fn new(cache: Arc<dyn TileCache>, config: CleanupConfig) -> Self {
        Self { cache, config }
    }

    /// Sweep once.
    pub async fn run_once(&self) -> StorageResult<SweepStats> {
        let started = Instant::now();
        let stats = self.cache.sweep().await?;
        let elapsed = started.elapsed();
        metrics::record_sweep(&stats, elapsed);

        info!(
            backend = self.cache.backend(),
            scanned = stats.scanned,
            removed = stats.removed,
            bytes_freed = stats.bytes_freed,
            temp_removed = stats.temp_removed,
            errors = stats.errors,
            elapsed_ms = elapsed.as_millis() as u64,
            "Cache sweep complete"
        );
        Ok(stats)
    }

    /// Sweep on every tick, starting immediately.
    pub async fn run_forever(self) {
        if !self.config.enabled {
            info!("Cache sweep disabled");
            return;
        }

        info!(
            interval_secs = self.config.interval_secs,
            ttl_secs = self.cache.ttl().as_secs(),
            "Starting cache sweep task"
        );

        let mut ticker = interval(Duration::from_secs(self.config.interval_secs.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // First tick completes immediately
            ticker.tick().await;
            if let Err(e) = self.run_once().await {
                error!(error = %e, "Cache sweep failed");
            }
        }
    }

    /// Spawn the sweep loop onto the runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run_forever())
    }
}
