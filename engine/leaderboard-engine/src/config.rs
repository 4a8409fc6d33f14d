//! Configuration for the leaderboard engine

use crate::error::{LeaderboardError, Result};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use snapshot_store::StoreConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Number of entries kept per leaderboard
pub const DEFAULT_TOP_N: usize = 10;

/// Upper bound on any single external call
pub const DEFAULT_IO_TIMEOUT_MS: u64 = 5_000;

/// Main engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderboardConfig {
    /// Leaderboard size; drives both truncation and the displayed title
    pub top_n: usize,

    /// Timeout applied to every registry, prediction, performance and store call
    pub io_timeout_ms: u64,

    /// Snapshot store configuration
    pub store: StoreConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Postgres connection URL for the database-backed collaborators
    pub database_url: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty, compact)
    pub format: String,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            io_timeout_ms: DEFAULT_IO_TIMEOUT_MS,
            store: StoreConfig::default(),
            logging: LoggingConfig::default(),
            database_url: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "compact".to_string() }
    }
}

impl LeaderboardConfig {
    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }

    /// Load configuration from environment variables (and `.env` if present)
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let mut config = Self::default();

        if let Ok(top_n) = std::env::var("LEADERBOARD_TOP_N") {
            config.top_n = top_n.parse().context("LEADERBOARD_TOP_N must be a positive integer")?;
        }

        if let Ok(timeout) = std::env::var("LEADERBOARD_IO_TIMEOUT_MS") {
            config.io_timeout_ms =
                timeout.parse().context("LEADERBOARD_IO_TIMEOUT_MS must be an integer")?;
        }

        if let Ok(data_dir) = std::env::var("LEADERBOARD_DATA_DIR") {
            config.store.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(level) = std::env::var("LEADERBOARD_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Ok(format) = std::env::var("LEADERBOARD_LOG_FORMAT") {
            config.logging.format = format;
        }

        if let Ok(database_url) = std::env::var("DATABASE_URL") {
            config.database_url = Some(database_url);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML/JSON/YAML file, overridden by
    /// `LEADERBOARD__*` environment variables (e.g. `LEADERBOARD__STORE__COMPRESS=true`)
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        tracing::debug!("Loading configuration from file: {:?}", path);

        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("LEADERBOARD").separator("__").try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read configuration from {:?}", path))?;

        let config: Self = settings.try_deserialize().context("Invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.top_n == 0 {
            return Err(LeaderboardError::config("top_n must be greater than 0"));
        }

        if self.io_timeout_ms == 0 {
            return Err(LeaderboardError::config("io_timeout_ms must be greater than 0"));
        }

        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => return Err(LeaderboardError::config(format!("Invalid log level: {}", other))),
        }

        match self.logging.format.as_str() {
            "json" | "pretty" | "compact" => {}
            other => {
                return Err(LeaderboardError::config(format!("Invalid log format: {}", other)))
            }
        }

        self.store.validate().map_err(LeaderboardError::config)
    }
}
