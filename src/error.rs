//! Unified error handling for the heatline crate
//!
//! Domain-specific errors ([`EngineError`], [`StoreError`]) stay usable on
//! their own; this module wraps them into a single [`Error`] enum for code
//! that crosses module boundaries, with a coarse [`ErrorCategory`] matching
//! the engine's error taxonomy (validation / capacity / conflict / storage).

use thiserror::Error;

pub use crate::engine::error::EngineError;
pub use crate::store::StoreError;

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Precondition failures; nothing was written
    Validation,
    /// Target heat has no free lane
    Capacity,
    /// Competitor already present in the target event
    Conflict,
    /// Persistence failures
    Storage,
    /// Configuration and setup errors
    Config,
    /// Other/unknown errors
    Other,
}

/// Unified error type for the heatline crate
#[derive(Error, Debug)]
pub enum Error {
    /// Scheduling and assignment errors
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// Storage errors reaching the caller directly
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Coarse category for handling strategies.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Engine(e) => match e {
                EngineError::HeatFull { .. } => ErrorCategory::Capacity,
                EngineError::DuplicateEntry { .. } => ErrorCategory::Conflict,
                EngineError::Store(_) => ErrorCategory::Storage,
                EngineError::NotFound { .. } => ErrorCategory::Other,
                _ => ErrorCategory::Validation,
            },
            Self::Store(_) | Self::Io(_) => ErrorCategory::Storage,
            Self::Json(_) => ErrorCategory::Other,
            Self::Config(_) => ErrorCategory::Config,
        }
    }

    /// Whether re-running the operation against a fresh read can succeed.
    ///
    /// Storage failures are worth retrying because every engine operation is
    /// idempotent given the same stored state; validation, capacity, and
    /// conflict outcomes will repeat until the caller changes something.
    pub fn is_recoverable(&self) -> bool {
        matches!(self.category(), ErrorCategory::Storage)
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
