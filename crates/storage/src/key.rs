//! Deterministic cache keys.

use sha2::{Digest, Sha256};
use tile_common::TileCoord;

/// Cache key for a rendered tile: coordinate plus rendering parameters.
///
/// Parameters are sorted by name, so the same logical request always maps
/// to the same key whatever order its parameters arrived in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    coord: TileCoord,
    key: String,
}

impl CacheKey {
    pub fn new<I, K, V>(coord: TileCoord, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut params: Vec<(String, String)> = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        // Stable: repeated names keep their relative order
        params.sort_by(|a, b| a.0.cmp(&b.0));

        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        Self {
            coord,
            key: format!("{}_{}", coord.cache_key(), query),
        }
    }

    pub fn coord(&self) -> TileCoord {
        self.coord
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// Lowercase hex SHA-256 of the key, safe to use as a file name.
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(self.key.as_bytes()))
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key)
    }
}
