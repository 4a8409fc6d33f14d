//! Postgres-backed snapshot store
//!
//! Records live in a single table keyed by snapshot key. The conditional write
//! is `INSERT ... ON CONFLICT (key) DO NOTHING`, so concurrent writers in
//! different processes still produce exactly one record.

use crate::backend::SnapshotStore;
use crate::error::{Result, StoreError};
use crate::record::{RecordMetadata, StoredRecord, WriteOutcome, RECORD_VERSION};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS leaderboard_snapshots (
    key         TEXT PRIMARY KEY,
    write_id    UUID NOT NULL,
    written_at  TIMESTAMPTZ NOT NULL,
    version     TEXT NOT NULL,
    payload     JSONB NOT NULL
)
"#;

/// Postgres snapshot store
#[derive(Clone)]
pub struct PgSnapshotStore {
    pool: PgPool,
}

impl PgSnapshotStore {
    /// Wrap an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to `database_url`
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    /// Create the snapshot table if it does not exist
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        tracing::info!("leaderboard_snapshots table ready");
        Ok(())
    }
}

#[async_trait::async_trait]
impl<T> SnapshotStore<T> for PgSnapshotStore
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn read_record(&self, key: &str) -> Result<Option<StoredRecord<T>>> {
        if key.is_empty() {
            return Err(StoreError::invalid_key("key must not be empty"));
        }

        let row: Option<(Uuid, DateTime<Utc>, String, serde_json::Value)> = sqlx::query_as(
            "SELECT write_id, written_at, version, payload FROM leaderboard_snapshots WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        let Some((write_id, written_at, version, payload)) = row else {
            return Ok(None);
        };

        Ok(Some(StoredRecord {
            key: key.to_string(),
            write_id,
            written_at,
            metadata: RecordMetadata { version, compression: None },
            value: serde_json::from_value(payload)?,
        }))
    }

    async fn write_if_absent(&self, key: &str, value: &T) -> Result<WriteOutcome> {
        if key.is_empty() {
            return Err(StoreError::invalid_key("key must not be empty"));
        }

        let payload = serde_json::to_value(value)?;

        let result = sqlx::query(
            "INSERT INTO leaderboard_snapshots (key, write_id, written_at, version, payload) \
             VALUES ($1, $2, $3, $4, $5) ON CONFLICT (key) DO NOTHING",
        )
        .bind(key)
        .bind(Uuid::new_v4())
        .bind(Utc::now())
        .bind(RECORD_VERSION)
        .bind(payload)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            Ok(WriteOutcome::Written)
        } else {
            Ok(WriteOutcome::AlreadyExists)
        }
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
