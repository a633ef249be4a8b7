//! Tiles that are never rendered.
//!
//! Some datasets have regions that decode into garbage or take pathological
//! time to read. Their coordinates are listed in a YAML file and served as
//! transparent tiles without touching the raster:
//!
//! ```yaml
//! tiles:
//!   - { z: 6, x: 19, y: 42 }
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

use tile_common::TileCoord;

#[derive(Debug, Deserialize)]
struct BlacklistFile {
    #[serde(default)]
    tiles: Vec<TileCoord>,
}

#[derive(Debug, Clone, Default)]
pub struct Blacklist {
    tiles: HashSet<TileCoord>,
}

impl Blacklist {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_tiles(tiles: impl IntoIterator<Item = TileCoord>) -> Self {
        Self {
            tiles: tiles.into_iter().collect(),
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let file: BlacklistFile = serde_yaml::from_str(yaml).context("invalid blacklist YAML")?;
        Ok(Self::from_tiles(file.tiles))
    }

    /// Load the blacklist file.
    ///
    /// No path, or a path that does not exist, gives an empty list with a
    /// warning. A file that exists but cannot be parsed is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            warn!("No blacklist path configured, no tiles blacklisted");
            return Ok(Self::empty());
        };
        if !path.exists() {
            warn!(path = %path.display(), "Blacklist file not found, no tiles blacklisted");
            return Ok(Self::empty());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let blacklist = Self::from_yaml_str(&contents)
            .with_context(|| format!("failed to load {}", path.display()))?;
        info!(path = %path.display(), tiles = blacklist.len(), "Loaded tile blacklist");
        Ok(blacklist)
    }

    pub fn contains(&self, coord: &TileCoord) -> bool {
        self.tiles.contains(coord)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    fn load_with_logs(path: Option<&Path>) -> (Blacklist, String) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let list = tracing::subscriber::with_default(subscriber, || Blacklist::load(path)).unwrap();
        (list, logs.text())
    }

    #[test]
    fn test_parse_yaml() {
        let list = Blacklist::from_yaml_str(
            "tiles:\n  - { z: 6, x: 19, y: 42 }\n  - z: 6\n    x: 22\n    y: 42\n",
        )
        .unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.contains(&TileCoord::new(6, 19, 42)));
        assert!(list.contains(&TileCoord::new(6, 22, 42)));
        assert!(!list.contains(&TileCoord::new(6, 42, 19)));
    }

    #[test]
    fn test_empty_document() {
        assert!(Blacklist::from_yaml_str("{}").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_yaml_is_error() {
        assert!(Blacklist::from_yaml_str("tiles: [{ z: six }]").is_err());
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let list = Blacklist::load(Some(&dir.path().join("nope.yaml"))).unwrap();
        assert!(list.is_empty());
        assert!(Blacklist::load(None).unwrap().is_empty());
    }

    #[test]
    fn test_load_without_path_warns() {
        let (list, logs) = load_with_logs(None);
        assert!(list.is_empty());
        assert!(logs.contains("WARN"));
        assert!(logs.contains("No blacklist path configured"));
    }

    #[test]
    fn test_load_missing_file_warns() {
        let dir = tempfile::tempdir().unwrap();
        let (_, logs) = load_with_logs(Some(&dir.path().join("nope.yaml")));
        assert!(logs.contains("Blacklist file not found"));
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "tiles:\n  - {{ z: 3, x: 1, y: 2 }}").unwrap();
        let list = Blacklist::load(Some(file.path())).unwrap();
        assert!(list.contains(&TileCoord::new(3, 1, 2)));
    }

    #[test]
    fn test_shipped_blacklist_parses() {
        let yaml = include_str!("../../../config/blacklist.yaml");
        let list = Blacklist::from_yaml_str(yaml).unwrap();
        assert_eq!(list.len(), 10);
        assert!(list.contains(&TileCoord::new(6, 19, 42)));
        assert!(list.contains(&TileCoord::new(6, 23, 39)));
    }
}
