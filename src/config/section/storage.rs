//! `[storage]` section configuration.
//!
//! Where resolution state survives between runs.
//!
//! # Example
//!
//! ```toml
//! [storage]
//! enable = true              # false = in-memory only (nothing persisted)
//! dir = ".multicdn/cache"    # Relative to the config file; `~` is expanded
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default storage directory (inside project root)
pub const DEFAULT_STORAGE_DIR: &str = ".multicdn/cache";

/// Durable storage settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Persist resolution cache and metrics.
    pub enable: bool,

    /// Storage directory.
    pub dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enable: true,
            dir: PathBuf::from(DEFAULT_STORAGE_DIR),
        }
    }
}

impl StorageConfig {
    /// Expand `~` and resolve relative to the project root.
    pub fn normalize(&mut self, root: &Path) {
        let raw = self.dir.to_string_lossy();
        let expanded = PathBuf::from(shellexpand::tilde(raw.as_ref()).into_owned());
        self.dir = if expanded.is_relative() {
            root.join(expanded)
        } else {
            expanded
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_storage_defaults() {
        let config = test_parse_config("");
        assert!(config.storage.enable);
        assert_eq!(config.storage.dir, PathBuf::from(DEFAULT_STORAGE_DIR));
    }

    #[test]
    fn test_normalize_relative_dir() {
        let mut storage = StorageConfig::default();
        storage.normalize(Path::new("/srv/site"));
        assert_eq!(storage.dir, PathBuf::from("/srv/site/.multicdn/cache"));
    }

    #[test]
    fn test_normalize_absolute_dir() {
        let mut storage = StorageConfig {
            enable: true,
            dir: PathBuf::from("/var/cache/multicdn"),
        };
        storage.normalize(Path::new("/srv/site"));
        assert_eq!(storage.dir, PathBuf::from("/var/cache/multicdn"));
    }
}
