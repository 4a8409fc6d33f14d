//! Postgres-backed collaborators
//!
//! Reads matches, predictions and player targets from the application's
//! database. The engine never writes to these tables.

use crate::error::{LeaderboardError, Result};
use crate::sources::{MatchRegistry, PerformanceIndex, PredictionSource};
use crate::types::{Match, MatchStatus, PlayerId, PlayerMatchTarget, Prediction};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::info;

#[derive(sqlx::FromRow)]
struct MatchRow {
    id: String,
    team_a: String,
    team_b: String,
    venue: String,
    scheduled_at: DateTime<Utc>,
    description: Option<String>,
    status: String,
}

impl TryFrom<MatchRow> for Match {
    type Error = LeaderboardError;

    fn try_from(row: MatchRow) -> Result<Self> {
        let status = MatchStatus::parse(&row.status).ok_or_else(|| {
            LeaderboardError::storage(format!("match {} has unknown status '{}'", row.id, row.status))
        })?;

        Ok(Match {
            id: row.id,
            team_a: row.team_a,
            team_b: row.team_b,
            venue: row.venue,
            scheduled_at: row.scheduled_at,
            description: row.description,
            status,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PredictionRow {
    id: String,
    user_id: String,
    user_label: String,
    match_id: String,
    player_ids: Vec<String>,
    submitted_at: DateTime<Utc>,
}

impl From<PredictionRow> for Prediction {
    fn from(row: PredictionRow) -> Self {
        Prediction {
            id: row.id,
            user_id: row.user_id,
            user_label: row.user_label,
            match_id: row.match_id,
            player_ids: row.player_ids,
            submitted_at: row.submitted_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TargetRow {
    player_id: String,
    match_id: String,
    target: f64,
    actual: Option<f64>,
}

/// Match registry, prediction source and performance index over one pool
#[derive(Clone)]
pub struct PgDataSource {
    pool: PgPool,
}

impl PgDataSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to `database_url` with a small pool
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(max_connections).connect(database_url).await?;
        info!("Connected prediction data source ({} connections max)", max_connections);
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl MatchRegistry for PgDataSource {
    async fn get(&self, match_id: &str) -> Result<Option<Match>> {
        let row: Option<MatchRow> = sqlx::query_as(
            "SELECT id, team_a, team_b, venue, scheduled_at, description, status \
             FROM matches WHERE id = $1",
        )
        .bind(match_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Match::try_from).transpose()
    }

    async fn list_by_status(&self, status: MatchStatus) -> Result<Vec<Match>> {
        let rows: Vec<MatchRow> = sqlx::query_as(
            "SELECT id, team_a, team_b, venue, scheduled_at, description, status \
             FROM matches WHERE status = $1",
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Match::try_from).collect()
    }
}

#[async_trait::async_trait]
impl PredictionSource for PgDataSource {
    async fn list_by_match(&self, match_id: &str) -> Result<Vec<Prediction>> {
        let rows: Vec<PredictionRow> = sqlx::query_as(
            "SELECT id, user_id, user_label, match_id, player_ids, submitted_at \
             FROM predictions WHERE match_id = $1 ORDER BY submitted_at ASC, id ASC",
        )
        .bind(match_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Prediction::from).collect())
    }
}

#[async_trait::async_trait]
impl PerformanceIndex for PgDataSource {
    async fn list_targets(&self, match_id: &str) -> Result<HashMap<PlayerId, PlayerMatchTarget>> {
        let rows: Vec<TargetRow> = sqlx::query_as(
            "SELECT player_id, match_id, target, actual FROM player_targets WHERE match_id = $1",
        )
        .bind(match_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                (
                    row.player_id.clone(),
                    PlayerMatchTarget {
                        player_id: row.player_id,
                        match_id: row.match_id,
                        target: row.target,
                        actual: row.actual,
                    },
                )
            })
            .collect())
    }
}
