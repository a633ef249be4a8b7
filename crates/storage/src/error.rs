//! Error types for tile storage.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache error: {0}")]
    Cache(String),
}

pub type StorageResult<T> = Result<T, StorageError>;
