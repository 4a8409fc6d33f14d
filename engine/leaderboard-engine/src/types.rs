//! Domain types for match leaderboards

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type MatchId = String;
pub type UserId = String;
pub type PlayerId = String;
pub type PredictionId = String;

/// Lifecycle status of a match, owned by the match registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Upcoming,
    Live,
    Completed,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Upcoming => "upcoming",
            MatchStatus::Live => "live",
            MatchStatus::Completed => "completed",
        }
    }

    /// Parse the lowercase form used in storage
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "upcoming" => Some(MatchStatus::Upcoming),
            "live" => Some(MatchStatus::Live),
            "completed" => Some(MatchStatus::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cricket match as exposed by the match registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub team_a: String,
    pub team_b: String,
    pub venue: String,
    pub scheduled_at: DateTime<Utc>,
    pub description: Option<String>,
    pub status: MatchStatus,
}

impl Match {
    /// Display label, e.g. "India vs Australia"
    pub fn label(&self) -> String {
        format!("{} vs {}", self.team_a, self.team_b)
    }

    pub fn is_completed(&self) -> bool {
        self.status == MatchStatus::Completed
    }
}

/// A user's submitted set of player picks for one match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub id: PredictionId,
    pub user_id: UserId,

    /// Name shown on the leaderboard
    pub user_label: String,

    pub match_id: MatchId,

    /// Selected players in pick order
    pub player_ids: Vec<PlayerId>,

    pub submitted_at: DateTime<Utc>,
}

/// Statistical target for one player in one match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerMatchTarget {
    pub player_id: PlayerId,
    pub match_id: MatchId,
    pub target: f64,

    /// Achieved value; absent until the match is scored
    pub actual: Option<f64>,
}

impl PlayerMatchTarget {
    /// A pick is correct once an actual value exists and meets the target
    pub fn is_met(&self) -> bool {
        matches!(self.actual, Some(actual) if actual >= self.target)
    }
}

/// One ranked row of a leaderboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// 1-based position in the snapshot
    pub rank: u32,
    pub user_id: UserId,
    pub user_label: String,
    pub prediction_id: PredictionId,
    pub correct_picks: u32,
    pub total_picks: u32,
    pub match_id: MatchId,
}

/// The cached, ranked leaderboard for one match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardSnapshot {
    pub match_id: MatchId,

    /// Entries ordered by correct picks descending, ties by submission order
    pub entries: Vec<LeaderboardEntry>,

    pub computed_at: DateTime<Utc>,

    /// Size limit the entries were truncated to
    pub top_n: usize,

    /// Number of predictions ranked before truncation
    pub total_predictions: usize,
}

impl LeaderboardSnapshot {
    /// Snapshot for a match nobody has predicted yet
    pub fn empty(match_id: impl Into<MatchId>, top_n: usize, computed_at: DateTime<Utc>) -> Self {
        Self { match_id: match_id.into(), entries: Vec::new(), computed_at, top_n, total_predictions: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entry for `user_id`, if it made the cut
    pub fn entry_for(&self, user_id: &str) -> Option<&LeaderboardEntry> {
        self.entries.iter().find(|entry| entry.user_id == user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(actual: Option<f64>) -> PlayerMatchTarget {
        PlayerMatchTarget {
            player_id: "p1".to_string(),
            match_id: "m1".to_string(),
            target: 50.0,
            actual,
        }
    }

    #[test]
    fn test_target_met_only_with_actual_at_or_above_target() {
        assert!(target(Some(50.0)).is_met());
        assert!(target(Some(73.5)).is_met());
        assert!(!target(Some(49.9)).is_met());
        assert!(!target(None).is_met());
    }

    #[test]
    fn test_match_status_serializes_lowercase() {
        let json = serde_json::to_string(&MatchStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
        assert_eq!(MatchStatus::parse("live"), Some(MatchStatus::Live));
        assert_eq!(MatchStatus::parse("LIVE"), None);
    }

    #[test]
    fn test_match_label() {
        let m = Match {
            id: "m1".to_string(),
            team_a: "India".to_string(),
            team_b: "Australia".to_string(),
            venue: "Wankhede".to_string(),
            scheduled_at: Utc::now(),
            description: None,
            status: MatchStatus::Upcoming,
        };
        assert_eq!(m.label(), "India vs Australia");
        assert!(!m.is_completed());
    }
}
