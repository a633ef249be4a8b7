//! HTTP request handlers.
//!
//! - `tiles`: `GET /tiles/:z/:x/:y`
//! - `metadata`: `GET /metadata`
//! - `metrics`: health check and Prometheus scrape
//! - `common`: shared response helpers

pub mod common;
pub mod metadata;
pub mod metrics;
pub mod tiles;

pub use common::error_response;
pub use metadata::{metadata_handler, MetadataResponse};
pub use metrics::{health_handler, metrics_handler, HealthResponse};
pub use tiles::{parse_coord, tile_handler};
