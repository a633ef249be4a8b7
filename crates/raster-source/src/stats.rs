//! Dataset summary statistics used to pick default rendering bounds.

use serde::{Deserialize, Serialize};
use tile_common::{PixelWindow, SampleBlock};
use tracing::{error, info};

use crate::source::RasterSource;

/// Lowest default lower bound.
pub const SUGGESTED_MIN_FLOOR: f64 = 0.1;
/// Highest default upper bound.
pub const SUGGESTED_MAX_CEILING: f64 = 200.0;
/// Side of the top-left window sampled at startup.
pub const SAMPLE_WINDOW_SIDE: usize = 1000;

/// Summary of positive valid samples.
///
/// Everything but the suggested bounds is absent when the sample held no
/// positive values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p1: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p99: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub median: Option<f64>,
    pub suggested_min: f64,
    pub suggested_max: f64,
}

impl Default for DatasetStats {
    fn default() -> Self {
        Self {
            sample_min: None,
            sample_max: None,
            p1: None,
            p99: None,
            mean: None,
            median: None,
            suggested_min: SUGGESTED_MIN_FLOOR,
            suggested_max: SUGGESTED_MAX_CEILING,
        }
    }
}

/// Compute stats over the valid, strictly positive samples of a block.
pub fn compute_sample_stats(block: &SampleBlock) -> DatasetStats {
    let mut values: Vec<f64> = block
        .data
        .iter()
        .zip(&block.valid)
        .filter(|(v, ok)| **ok && **v > 0.0)
        .map(|(v, _)| *v as f64)
        .collect();

    if values.is_empty() {
        return DatasetStats::default();
    }

    values.sort_by(|a, b| a.total_cmp(b));
    let p1 = percentile(&values, 1.0);
    let p99 = percentile(&values, 99.0);

    let mut suggested_min = p1.max(SUGGESTED_MIN_FLOOR);
    let mut suggested_max = p99.min(SUGGESTED_MAX_CEILING);
    if suggested_min >= suggested_max {
        suggested_min = SUGGESTED_MIN_FLOOR;
        suggested_max = SUGGESTED_MAX_CEILING;
    }

    DatasetStats {
        sample_min: values.first().copied(),
        sample_max: values.last().copied(),
        p1: Some(p1),
        p99: Some(p99),
        mean: Some(values.iter().sum::<f64>() / values.len() as f64),
        median: Some(percentile(&values, 50.0)),
        suggested_min,
        suggested_max,
    }
}

/// Sample the top-left corner of the dataset.
///
/// A failed read degrades to the default stats.
pub async fn sample_dataset_stats(source: &dyn RasterSource) -> DatasetStats {
    let meta = source.metadata();
    let window = PixelWindow::new(
        0,
        0,
        meta.height.min(SAMPLE_WINDOW_SIDE),
        meta.width.min(SAMPLE_WINDOW_SIDE),
    );

    match source.read_window(&window).await {
        Ok(block) => {
            let stats = compute_sample_stats(&block);
            info!(
                suggested_min = stats.suggested_min,
                suggested_max = stats.suggested_max,
                p1 = ?stats.p1,
                p99 = ?stats.p99,
                "Computed dataset stats"
            );
            stats
        }
        Err(e) => {
            error!(error = %e, "Failed to sample dataset stats, using defaults");
            DatasetStats::default()
        }
    }
}

/// Linear-interpolated percentile of sorted, non-empty values.
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    let rank = pct * (sorted.len() - 1) as f64 / 100.0;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}
