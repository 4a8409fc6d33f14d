//! In-memory collaborators for tests and single-process embedding

use crate::error::Result;
use crate::sources::{MatchRegistry, PerformanceIndex, PredictionSource};
use crate::types::{Match, MatchId, MatchStatus, PlayerId, PlayerMatchTarget, Prediction};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Match registry backed by a map
#[derive(Clone, Default)]
pub struct InMemoryMatchRegistry {
    matches: Arc<RwLock<HashMap<MatchId, Match>>>,
}

impl InMemoryMatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a match
    pub async fn upsert(&self, m: Match) {
        self.matches.write().await.insert(m.id.clone(), m);
    }

    pub async fn set_status(&self, match_id: &str, status: MatchStatus) -> bool {
        match self.matches.write().await.get_mut(match_id) {
            Some(m) => {
                m.status = status;
                true
            }
            None => false,
        }
    }
}

#[async_trait::async_trait]
impl MatchRegistry for InMemoryMatchRegistry {
    async fn get(&self, match_id: &str) -> Result<Option<Match>> {
        Ok(self.matches.read().await.get(match_id).cloned())
    }

    async fn list_by_status(&self, status: MatchStatus) -> Result<Vec<Match>> {
        let matches = self.matches.read().await;
        Ok(matches.values().filter(|m| m.status == status).cloned().collect())
    }
}

/// Prediction source that keeps predictions in submission order.
///
/// Counts calls and can add artificial latency so callers can observe how
/// often, and how concurrently, predictions were fetched.
#[derive(Clone, Default)]
pub struct InMemoryPredictionSource {
    predictions: Arc<RwLock<Vec<Prediction>>>,
    latency: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl InMemoryPredictionSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every `list_by_match` call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Append a prediction; appending order is submission order
    pub async fn submit(&self, prediction: Prediction) {
        self.predictions.write().await.push(prediction);
    }

    /// Number of `list_by_match` calls served so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PredictionSource for InMemoryPredictionSource {
    async fn list_by_match(&self, match_id: &str) -> Result<Vec<Prediction>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let predictions = self.predictions.read().await;
        Ok(predictions.iter().filter(|p| p.match_id == match_id).cloned().collect())
    }
}

/// Performance index backed by a per-match map
#[derive(Clone, Default)]
pub struct InMemoryPerformanceIndex {
    targets: Arc<RwLock<HashMap<MatchId, HashMap<PlayerId, PlayerMatchTarget>>>>,
}

impl InMemoryPerformanceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the target for one (match, player) pair
    pub async fn set_target(&self, target: PlayerMatchTarget) {
        let mut targets = self.targets.write().await;
        targets
            .entry(target.match_id.clone())
            .or_default()
            .insert(target.player_id.clone(), target);
    }

    /// Record the achieved value for a player; returns false if no target exists
    pub async fn record_actual(&self, match_id: &str, player_id: &str, actual: f64) -> bool {
        let mut targets = self.targets.write().await;
        match targets.get_mut(match_id).and_then(|m| m.get_mut(player_id)) {
            Some(target) => {
                target.actual = Some(actual);
                true
            }
            None => false,
        }
    }
}

#[async_trait::async_trait]
impl PerformanceIndex for InMemoryPerformanceIndex {
    async fn list_targets(&self, match_id: &str) -> Result<HashMap<PlayerId, PlayerMatchTarget>> {
        Ok(self.targets.read().await.get(match_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_match(id: &str, status: MatchStatus) -> Match {
        Match {
            id: id.to_string(),
            team_a: "India".to_string(),
            team_b: "England".to_string(),
            venue: "Lord's".to_string(),
            scheduled_at: Utc::now(),
            description: Some("2nd Test".to_string()),
            status,
        }
    }

    #[tokio::test]
    async fn test_registry_filters_by_status() {
        let registry = InMemoryMatchRegistry::new();
        registry.upsert(sample_match("m1", MatchStatus::Completed)).await;
        registry.upsert(sample_match("m2", MatchStatus::Live)).await;

        let completed = registry.list_by_status(MatchStatus::Completed).await.unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, "m1");

        assert!(registry.set_status("m2", MatchStatus::Completed).await);
        assert!(!registry.set_status("missing", MatchStatus::Completed).await);
        assert_eq!(registry.list_by_status(MatchStatus::Completed).await.unwrap().len(), 2);
        assert!(registry.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_predictions_keep_submission_order() {
        let source = InMemoryPredictionSource::new();
        for (id, match_id) in [("p1", "m1"), ("p2", "m2"), ("p3", "m1")] {
            source
                .submit(Prediction {
                    id: id.to_string(),
                    user_id: format!("u-{id}"),
                    user_label: id.to_uppercase(),
                    match_id: match_id.to_string(),
                    player_ids: vec!["a".to_string()],
                    submitted_at: Utc::now(),
                })
                .await;
        }

        let ids: Vec<_> =
            source.list_by_match("m1").await.unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["p1", "p3"]);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_record_actual_requires_existing_target() {
        let index = InMemoryPerformanceIndex::new();
        index
            .set_target(PlayerMatchTarget {
                player_id: "kohli".to_string(),
                match_id: "m1".to_string(),
                target: 40.0,
                actual: None,
            })
            .await;

        assert!(index.record_actual("m1", "kohli", 82.0).await);
        assert!(!index.record_actual("m1", "root", 10.0).await);

        let targets = index.list_targets("m1").await.unwrap();
        assert_eq!(targets["kohli"].actual, Some(82.0));
        assert!(index.list_targets("m2").await.unwrap().is_empty());
    }
}
