//! Error types for raster access.

use thiserror::Error;

/// Errors that can occur while opening or reading a raster.
#[derive(Error, Debug)]
pub enum RasterError {
    /// Failed to open the dataset.
    #[error("failed to open raster {path}: {message}")]
    OpenFailed { path: String, message: String },

    /// Failed to read a window.
    #[error("failed to read raster window: {0}")]
    ReadFailed(String),

    /// The requested window lies outside the raster.
    #[error("window {requested} is outside raster bounds {raster}")]
    OutOfBounds { requested: String, raster: String },

    /// Missing or unusable georeferencing / layout tags.
    #[error("invalid raster metadata: {0}")]
    InvalidMetadata(String),

    /// TIFF decoding error.
    #[error("TIFF decode error: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// Neither the primary nor the fallback dataset could be opened.
    #[error("no usable dataset: {0}")]
    NoDataset(String),
}

impl RasterError {
    /// Create an OpenFailed error.
    pub fn open_failed(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OpenFailed {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a ReadFailed error.
    pub fn read_failed(msg: impl Into<String>) -> Self {
        Self::ReadFailed(msg.into())
    }

    /// Create an OutOfBounds error.
    pub fn out_of_bounds(requested: impl Into<String>, raster: impl Into<String>) -> Self {
        Self::OutOfBounds {
            requested: requested.into(),
            raster: raster.into(),
        }
    }

    /// Create an InvalidMetadata error.
    pub fn invalid_metadata(msg: impl Into<String>) -> Self {
        Self::InvalidMetadata(msg.into())
    }
}

/// Result type for raster operations.
pub type Result<T> = std::result::Result<T, RasterError>;
