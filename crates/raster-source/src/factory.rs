//! Opening the configured dataset, with a fallback path.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::RasterSourceConfig;
use crate::error::{RasterError, Result};
use crate::source::{GeoTiffSource, RasterSource};

/// A dataset opened at startup.
pub struct OpenedDataset {
    pub source: Arc<dyn RasterSource>,
    /// Path that was actually opened.
    pub path: String,
    /// True when the primary path failed and the fallback was used.
    pub used_fallback: bool,
}

/// Open the primary dataset, or the fallback if the primary cannot be opened.
///
/// This happens once; a dataset that later turns out to be damaged is not
/// swapped for the fallback.
pub fn open_dataset(config: &RasterSourceConfig) -> Result<OpenedDataset> {
    let cache_bytes = config.chunk_cache_size_bytes();

    let primary_error = match GeoTiffSource::open_with_cache(&config.primary_path, cache_bytes) {
        Ok(source) => {
            info!(path = %config.primary_path, "Using primary dataset");
            return Ok(OpenedDataset {
                source: Arc::new(source),
                path: config.primary_path.clone(),
                used_fallback: false,
            });
        }
        Err(e) => e,
    };

    let Some(fallback) = config.fallback_path.as_deref() else {
        error!(path = %config.primary_path, error = %primary_error, "Failed to open dataset");
        return Err(RasterError::NoDataset(format!(
            "{}: {}",
            config.primary_path, primary_error
        )));
    };

    warn!(
        path = %config.primary_path,
        fallback = %fallback,
        error = %primary_error,
        "Failed to open primary dataset, trying fallback"
    );

    match GeoTiffSource::open_with_cache(fallback, cache_bytes) {
        Ok(source) => {
            info!(path = %fallback, "Using fallback dataset");
            Ok(OpenedDataset {
                source: Arc::new(source),
                path: fallback.to_string(),
                used_fallback: true,
            })
        }
        Err(e) => {
            error!(path = %fallback, error = %e, "Failed to open fallback dataset");
            Err(RasterError::NoDataset(format!(
                "{}: {}; {}: {}",
                config.primary_path, primary_error, fallback, e
            )))
        }
    }
}
