//! Public entry point: eligible matches and their leaderboards

use crate::cache::{CacheStats, LeaderboardCache};
use crate::config::LeaderboardConfig;
use crate::error::{with_timeout, Result};
use crate::ranking::RankingEngine;
use crate::sources::{MatchRegistry, PerformanceIndex, PredictionSource};
use crate::types::{LeaderboardSnapshot, Match, MatchStatus};
use snapshot_store::SnapshotStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Lists completed matches and serves their cached leaderboards
pub struct LeaderboardService {
    registry: Arc<dyn MatchRegistry>,
    cache: Arc<LeaderboardCache>,
    io_timeout: Duration,
}

impl LeaderboardService {
    pub fn new(registry: Arc<dyn MatchRegistry>, cache: Arc<LeaderboardCache>) -> Self {
        let io_timeout = cache.engine().io_timeout();
        Self { registry, cache, io_timeout }
    }

    /// Wire engine, cache and service from a validated configuration
    pub fn from_config(
        config: &LeaderboardConfig,
        registry: Arc<dyn MatchRegistry>,
        predictions: Arc<dyn PredictionSource>,
        performance: Arc<dyn PerformanceIndex>,
        store: Arc<dyn SnapshotStore<LeaderboardSnapshot>>,
    ) -> Result<Self> {
        config.validate()?;

        let engine = RankingEngine::new(
            registry.clone(),
            predictions,
            performance,
            config.top_n,
            config.io_timeout(),
        );
        let cache = LeaderboardCache::new(Arc::new(engine), store);

        info!(
            "Leaderboard service ready (top {}, io timeout {:?})",
            config.top_n,
            config.io_timeout()
        );

        Ok(Self::new(registry, Arc::new(cache)))
    }

    /// Completed matches, most recently scheduled first
    pub async fn list_eligible_matches(&self) -> Result<Vec<Match>> {
        let mut matches = with_timeout(
            self.io_timeout,
            "completed match listing",
            self.registry.list_by_status(MatchStatus::Completed),
        )
        .await?;

        // Registries may not filter strictly; only completed matches get leaderboards.
        matches.retain(Match::is_completed);
        matches.sort_by(|a, b| b.scheduled_at.cmp(&a.scheduled_at).then_with(|| a.id.cmp(&b.id)));

        debug!("{} matches eligible for leaderboards", matches.len());
        Ok(matches)
    }

    /// Leaderboard for `match_id`.
    ///
    /// Meant for ids returned by [`list_eligible_matches`](Self::list_eligible_matches).
    /// Other ids are still served, best-effort: the snapshot is computed
    /// regardless of status and, once stored, never refreshed. A stored
    /// snapshot is returned without consulting the registry.
    pub async fn get_leaderboard(&self, match_id: &str) -> Result<LeaderboardSnapshot> {
        self.cache.get(match_id).await
    }

    /// Heading for leaderboards, derived from the same limit used to truncate them
    pub fn leaderboard_title(&self) -> String {
        format!("Top {} Predictors", self.cache.engine().top_n())
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
