//! Read-only collaborators the engine consumes
//!
//! Match metadata, submitted predictions and player targets all live in
//! external stores owned by the surrounding application. The engine only
//! reads them through these traits.

use crate::error::Result;
use crate::types::{Match, MatchStatus, PlayerId, PlayerMatchTarget, Prediction};
use std::collections::HashMap;

/// Resolves match metadata
#[async_trait::async_trait]
pub trait MatchRegistry: Send + Sync {
    /// Fetch a match by id
    async fn get(&self, match_id: &str) -> Result<Option<Match>>;

    /// List every match in `status`, in no particular order
    async fn list_by_status(&self, status: MatchStatus) -> Result<Vec<Match>>;
}

/// Yields submitted predictions
#[async_trait::async_trait]
pub trait PredictionSource: Send + Sync {
    /// Every prediction for `match_id`, in submission order (oldest first)
    async fn list_by_match(&self, match_id: &str) -> Result<Vec<Prediction>>;
}

/// Resolves per-player targets and achieved values
#[async_trait::async_trait]
pub trait PerformanceIndex: Send + Sync {
    /// All targets recorded for `match_id`, keyed by player id
    async fn list_targets(&self, match_id: &str) -> Result<HashMap<PlayerId, PlayerMatchTarget>>;
}
