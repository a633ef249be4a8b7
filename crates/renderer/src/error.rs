//! Error types for tile rendering.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("invalid dimensions {width}x{height}: {message}")]
    InvalidDimensions {
        width: usize,
        height: usize,
        message: String,
    },

    #[error("PNG encoding failed: {0}")]
    Encode(String),
}

impl From<std::io::Error> for RenderError {
    fn from(e: std::io::Error) -> Self {
        Self::Encode(e.to_string())
    }
}

pub type RenderResult<T> = Result<T, RenderError>;
