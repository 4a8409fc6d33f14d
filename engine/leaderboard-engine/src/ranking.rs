//! Prediction scoring and ranking
//!
//! A pick is correct when the player's achieved value meets or exceeds the
//! target. Entries are ordered by correct picks, highest first; predictions
//! with equal scores keep their submission order, so recomputing over the
//! same data always yields the same leaderboard.

use crate::clock::{Clock, SystemClock};
use crate::error::{with_timeout, LeaderboardError, Result};
use crate::sources::{MatchRegistry, PerformanceIndex, PredictionSource};
use crate::types::{LeaderboardEntry, LeaderboardSnapshot, PlayerId, PlayerMatchTarget, Prediction};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Score predictions against targets, rank them and keep the best `top_n`.
///
/// Picks with no target row, or whose target has no actual value yet, count
/// as not correct but still count towards `total_picks`. Duplicate player ids
/// within one prediction are counted once.
pub fn rank_predictions(
    predictions: &[Prediction],
    targets: &HashMap<PlayerId, PlayerMatchTarget>,
    top_n: usize,
) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = predictions
        .iter()
        .map(|prediction| {
            let mut seen = HashSet::with_capacity(prediction.player_ids.len());
            let mut total_picks = 0u32;
            let mut correct_picks = 0u32;

            for player_id in &prediction.player_ids {
                if !seen.insert(player_id.as_str()) {
                    debug!(
                        "Prediction {} selects player {} more than once",
                        prediction.id, player_id
                    );
                    continue;
                }
                total_picks += 1;

                match targets.get(player_id) {
                    Some(target) if target.is_met() => correct_picks += 1,
                    Some(_) => {}
                    None => debug!(
                        "No target recorded for player {} in match {} (prediction {})",
                        player_id, prediction.match_id, prediction.id
                    ),
                }
            }

            LeaderboardEntry {
                rank: 0,
                user_id: prediction.user_id.clone(),
                user_label: prediction.user_label.clone(),
                prediction_id: prediction.id.clone(),
                correct_picks,
                total_picks,
                match_id: prediction.match_id.clone(),
            }
        })
        .collect();

    // sort_by is stable: equal scores stay in submission order
    entries.sort_by(|a, b| b.correct_picks.cmp(&a.correct_picks));
    entries.truncate(top_n);

    for (position, entry) in entries.iter_mut().enumerate() {
        entry.rank = position as u32 + 1;
    }

    entries
}

/// Converts raw predictions into a ranked snapshot for one match
pub struct RankingEngine {
    registry: Arc<dyn MatchRegistry>,
    predictions: Arc<dyn PredictionSource>,
    performance: Arc<dyn PerformanceIndex>,
    clock: Arc<dyn Clock>,
    top_n: usize,
    io_timeout: Duration,
}

impl RankingEngine {
    /// Create a new ranking engine using the wall clock
    pub fn new(
        registry: Arc<dyn MatchRegistry>,
        predictions: Arc<dyn PredictionSource>,
        performance: Arc<dyn PerformanceIndex>,
        top_n: usize,
        io_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            predictions,
            performance,
            clock: Arc::new(SystemClock),
            top_n,
            io_timeout,
        }
    }

    /// Replace the clock used for `computed_at`
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    pub fn io_timeout(&self) -> Duration {
        self.io_timeout
    }

    /// Compute the leaderboard for `match_id`.
    ///
    /// Fails with `MatchNotFound` for unknown matches. A match without
    /// predictions yields an empty snapshot. Matches that are not completed
    /// are still ranked, with a warning.
    pub async fn compute(&self, match_id: &str) -> Result<LeaderboardSnapshot> {
        let found = with_timeout(self.io_timeout, "match lookup", self.registry.get(match_id)).await?;
        let Some(found) = found else {
            return Err(LeaderboardError::MatchNotFound(match_id.to_string()));
        };
        if !found.is_completed() {
            warn!(
                "Ranking match {} in status {}; the stored leaderboard may go stale",
                match_id, found.status
            );
        }

        let predictions = with_timeout(
            self.io_timeout,
            "prediction listing",
            self.predictions.list_by_match(match_id),
        )
        .await?;

        if predictions.is_empty() {
            debug!("No predictions for match {}, returning empty leaderboard", match_id);
            return Ok(LeaderboardSnapshot::empty(match_id, self.top_n, self.clock.now()));
        }

        // One batch fetch for the whole match instead of one lookup per pick
        let targets = with_timeout(
            self.io_timeout,
            "target listing",
            self.performance.list_targets(match_id),
        )
        .await?;

        let entries = rank_predictions(&predictions, &targets, self.top_n);

        info!(
            "Ranked {} predictions for match {} ({} targets, kept top {})",
            predictions.len(),
            match_id,
            targets.len(),
            entries.len()
        );

        Ok(LeaderboardSnapshot {
            match_id: match_id.to_string(),
            entries,
            computed_at: self.clock.now(),
            top_n: self.top_n,
            total_predictions: predictions.len(),
        })
    }
}
