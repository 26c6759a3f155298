//! Error types for the scheduling engine

use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine-specific errors
///
/// Validation errors are surfaced before any mutation; capacity and conflict
/// errors are per-move and leave both heats unchanged. Locked reseed pairs
/// are NOT errors (see `ReseedOutcome::SkippedLocked`).
#[derive(Debug, Error)]
pub enum EngineError {
    /// Lane count below 1
    #[error("lane count must be at least 1, got {given}")]
    InvalidLaneCount { given: u32 },

    /// No anchor available: neither an explicit start nor a championship
    /// start time. The engine never guesses a start.
    #[error("no start time available; pass one or configure the championship start")]
    MissingStartTime,

    /// Nothing selected to operate on
    #[error("nothing to schedule: {reason}")]
    EmptySelection { reason: String },

    /// Recalculation origin has no scheduled time to walk from
    #[error("heat {heat_number} has no scheduled time to recalculate from")]
    UnscheduledAnchor { heat_number: i64 },

    /// Target heat has no free lane
    #[error("heat {heat_number} is full ({capacity} lanes occupied)")]
    HeatFull { heat_number: i64, capacity: u32 },

    /// Competitor already placed in a heat of the target event
    #[error("registration {registration_id} already occupies a heat of this event")]
    DuplicateEntry { registration_id: Uuid },

    /// Referenced record does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    /// Persistence failure, propagated as-is
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    /// Create an empty-selection error.
    pub fn empty_selection(reason: impl Into<String>) -> Self {
        Self::EmptySelection {
            reason: reason.into(),
        }
    }

    /// Create a not-found error for an entity.
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }

    /// True for precondition failures (no partial writes happened).
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidLaneCount { .. }
                | Self::MissingStartTime
                | Self::EmptySelection { .. }
                | Self::UnscheduledAnchor { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_classification() {
        assert!(EngineError::InvalidLaneCount { given: 0 }.is_validation());
        assert!(EngineError::MissingStartTime.is_validation());
        assert!(!EngineError::HeatFull {
            heat_number: 3,
            capacity: 4
        }
        .is_validation());
        assert!(!EngineError::DuplicateEntry {
            registration_id: Uuid::new_v4()
        }
        .is_validation());
    }

    #[test]
    fn test_error_messages() {
        let err = EngineError::HeatFull {
            heat_number: 5,
            capacity: 4,
        };
        assert!(err.to_string().contains("heat 5"));
        assert!(err.to_string().contains("4 lanes"));

        let err = EngineError::not_found("heat", Uuid::nil());
        assert!(err.to_string().contains("heat"));
        assert!(err.to_string().contains("not found"));
    }
}
