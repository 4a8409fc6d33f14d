//! On-disk record envelope

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current record format version
pub const RECORD_VERSION: &str = "1.0";

/// A persisted value together with the metadata of the write that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord<T> {
    /// Key the record was written under
    pub key: String,

    /// Identifier of the winning write
    pub write_id: Uuid,

    /// Timestamp of the write
    pub written_at: DateTime<Utc>,

    /// Metadata about the record
    pub metadata: RecordMetadata,

    /// The stored value
    pub value: T,
}

/// Record metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    /// Record format version
    pub version: String,

    /// Compression used
    pub compression: Option<String>,
}

impl<T> StoredRecord<T> {
    /// Wrap a value for a fresh write
    pub fn new(key: impl Into<String>, value: T, compression: Option<String>) -> Self {
        Self {
            key: key.into(),
            write_id: Uuid::new_v4(),
            written_at: Utc::now(),
            metadata: RecordMetadata { version: RECORD_VERSION.to_string(), compression },
            value,
        }
    }
}

/// Outcome of a conditional write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// This call created the record
    Written,

    /// A record already existed under the key; nothing was written
    AlreadyExists,
}

impl WriteOutcome {
    /// True when this call created the record
    pub fn is_written(self) -> bool {
        matches!(self, WriteOutcome::Written)
    }
}
