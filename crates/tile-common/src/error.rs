//! Error types for the tile services.

use thiserror::Error;

/// Result type alias using TileError.
pub type TileResult<T> = Result<T, TileError>;

/// Primary error type for tile operations.
#[derive(Debug, Error)]
pub enum TileError {
    // === Request Errors ===
    #[error("Invalid tile coordinate: {0}")]
    InvalidTile(String),

    // === Infrastructure Errors ===
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl TileError {
    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            TileError::InvalidTile(_) => 400,
            TileError::ConfigError(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(TileError::InvalidTile("z".into()).http_status_code(), 400);
        assert_eq!(TileError::ConfigError("policy".into()).http_status_code(), 500);
    }
}
