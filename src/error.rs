// src/error.rs

//! Unified error handling for the crawler application.

use thiserror::Error;

/// Result type alias for crawler operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
///
/// Per-request and per-partition failures are NOT errors: they travel as
/// `FetchOutcome` / `DocumentOutcome` / `PartitionError` values so the
/// orchestrator can count and continue. Everything here aborts the run.
#[derive(Error, Debug)]
pub enum AppError {
    /// Local disk failure. Fatal to the run: continuing after a failed
    /// write would silently lose documents.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client construction or other non-request reqwest failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Checkpoint file is corrupt or from an incompatible version
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a checkpoint error.
    pub fn checkpoint(message: impl Into<String>) -> Self {
        Self::Checkpoint(message.into())
    }
}
