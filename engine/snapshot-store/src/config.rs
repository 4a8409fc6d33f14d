//! Configuration for the snapshot store

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the snapshot store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Base directory for snapshot files
    pub data_dir: PathBuf,

    /// Whether to gzip snapshot files
    pub compress: bool,

    /// Whether to fsync each record before publishing it
    pub fsync: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            compress: false,
            fsync: true,
        }
    }
}

impl StoreConfig {
    /// Create a new configuration with custom data directory
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self { data_dir: data_dir.into(), ..Default::default() }
    }

    /// Get the snapshots directory path
    pub fn snapshots_dir(&self) -> PathBuf {
        self.data_dir.join("snapshots")
    }

    /// Get the directory used for in-progress writes
    pub fn staging_dir(&self) -> PathBuf {
        self.data_dir.join("staging")
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.data_dir.as_os_str().is_empty() {
            return Err("data_dir must not be empty".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directories_hang_off_data_dir() {
        let config = StoreConfig::new("/tmp/lb");
        assert_eq!(config.snapshots_dir(), PathBuf::from("/tmp/lb/snapshots"));
        assert_eq!(config.staging_dir(), PathBuf::from("/tmp/lb/staging"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_data_dir_is_rejected() {
        let config = StoreConfig::new("");
        assert!(config.validate().is_err());
    }
}
