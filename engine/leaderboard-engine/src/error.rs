//! Error types for the leaderboard engine

use crate::types::MatchId;
use snapshot_store::StoreError;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Result type for leaderboard operations
pub type Result<T> = std::result::Result<T, LeaderboardError>;

/// Errors surfaced by the leaderboard engine.
///
/// Missing or partial performance data is never an error; those picks simply
/// count as not correct.
#[derive(Error, Debug)]
pub enum LeaderboardError {
    #[error("Match not found: {0}")]
    MatchNotFound(MatchId),

    /// An external store failed or timed out; the whole request may be retried
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl LeaderboardError {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::StorageUnavailable(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, LeaderboardError::StorageUnavailable(_))
    }
}

impl From<StoreError> for LeaderboardError {
    fn from(err: StoreError) -> Self {
        LeaderboardError::StorageUnavailable(err.to_string())
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for LeaderboardError {
    fn from(err: sqlx::Error) -> Self {
        LeaderboardError::StorageUnavailable(err.to_string())
    }
}

/// Run an external call under `limit`; an elapsed timer becomes `StorageUnavailable`
pub async fn with_timeout<T, F>(limit: Duration, what: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!("{} timed out after {:?}", what, limit);
            Err(LeaderboardError::storage(format!("{} timed out after {:?}", what, limit)))
        }
    }
}
