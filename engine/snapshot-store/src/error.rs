//! Error types for the snapshot store

use thiserror::Error;

/// Result type alias for snapshot store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in the snapshot store
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O errors (file operations, permissions, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Stored record is unreadable or belongs to another key
    #[error("Data corruption: {0}")]
    Corruption(String),

    /// Key cannot be stored
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Backend refused the request
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Database errors from the Postgres backend
    #[cfg(feature = "postgres")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new corruption error
    pub fn corruption(msg: impl Into<String>) -> Self {
        Self::Corruption(msg.into())
    }

    /// Create a new invalid key error
    pub fn invalid_key(msg: impl Into<String>) -> Self {
        Self::InvalidKey(msg.into())
    }

    /// Create a new unavailable error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}
