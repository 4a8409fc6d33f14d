//! Local file-based snapshot store construction

use crate::backend::LocalSnapshotStore;
use crate::config::StoreConfig;
use crate::error::Result;

/// Open a local snapshot store with default configuration
pub fn create_local_store(data_dir: impl Into<std::path::PathBuf>) -> Result<LocalSnapshotStore> {
    LocalSnapshotStore::open(StoreConfig::new(data_dir))
}

/// Open a local snapshot store with custom configuration
pub fn create_local_store_with_config(config: StoreConfig) -> Result<LocalSnapshotStore> {
    LocalSnapshotStore::open(config)
}
