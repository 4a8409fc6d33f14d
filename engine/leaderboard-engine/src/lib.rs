//! Leaderboard Engine - match leaderboards for the prediction game
//!
//! Users pick players for a match; each pick has a statistical target and is
//! correct when the player's achieved value meets it. This crate ranks every
//! prediction for a match by correct picks, keeps the top N, and persists the
//! result once so later requests are served from storage.
//!
//! ## Architecture
//!
//! - **RankingEngine**: scores and ranks predictions for one match
//! - **LeaderboardCache**: read-through, compute-once cache over a snapshot store
//! - **LeaderboardService**: lists completed matches and serves their leaderboards
//!
//! Match metadata, predictions and targets come from the [`MatchRegistry`],
//! [`PredictionSource`] and [`PerformanceIndex`] traits.

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod ranking;
pub mod service;
pub mod sources;
pub mod types;


pub use crate::cache::{CacheStats, LeaderboardCache};
pub use crate::clock::{Clock, FixedClock, SystemClock};
pub use crate::config::{LeaderboardConfig, LoggingConfig, DEFAULT_TOP_N};
pub use crate::error::{LeaderboardError, Result};
pub use crate::logging::{initialize_logging, initialize_logging_with_config};
pub use crate::memory::{InMemoryMatchRegistry, InMemoryPerformanceIndex, InMemoryPredictionSource};
#[cfg(feature = "postgres")]
pub use crate::postgres::PgDataSource;
pub use crate::ranking::{rank_predictions, RankingEngine};
pub use crate::service::LeaderboardService;
pub use crate::sources::{MatchRegistry, PerformanceIndex, PredictionSource};
pub use crate::types::{
    LeaderboardEntry, LeaderboardSnapshot, Match, MatchId, MatchStatus, PlayerId,
    PlayerMatchTarget, Prediction, PredictionId, UserId,
};

/// Re-export the store types callers need to wire a cache
pub use snapshot_store::{InMemorySnapshotStore, LocalSnapshotStore, SnapshotStore, StoreConfig};
