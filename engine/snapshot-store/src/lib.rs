//! # Snapshot Store
//!
//! Durable, write-once storage for computed snapshots such as match
//! leaderboards. Each key holds at most one record; the first successful
//! `write_if_absent` wins and every later writer is told the key already
//! exists.
//!
//! ## Backends
//!
//! - **LocalSnapshotStore**: one JSON file per key (optionally gzip), published
//!   with a no-clobber link so racing processes cannot both win
//! - **InMemorySnapshotStore**: process-local map, used in tests
//! - **PgSnapshotStore** (feature `postgres`): `ON CONFLICT DO NOTHING` insert
//!
//! ## Usage
//!
//! ```rust
//! use snapshot_store::{create_local_store, SnapshotStore, WriteOutcome};
//! use tempfile::TempDir;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let temp_dir = TempDir::new()?;
//!     let store = create_local_store(temp_dir.path())?;
//!
//!     let outcome = store.write_if_absent("match-1", &vec![3u32, 2, 1]).await?;
//!     assert_eq!(outcome, WriteOutcome::Written);
//!
//!     let stored: Option<Vec<u32>> = store.read("match-1").await?;
//!     assert_eq!(stored, Some(vec![3, 2, 1]));
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod local;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod record;

pub use backend::{InMemorySnapshotStore, LocalSnapshotStore, SnapshotStore};
pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use local::{create_local_store, create_local_store_with_config};
#[cfg(feature = "postgres")]
pub use postgres::PgSnapshotStore;
pub use record::{RecordMetadata, StoredRecord, WriteOutcome};
