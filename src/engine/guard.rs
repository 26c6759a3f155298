//! Result lock guard
//!
//! A published result freezes its (event, category) pair for automatic
//! reseeding: once standings are public, a reseed would silently rewrite who
//! raced against whom. Manual lane edits stay allowed; only ReseedByRanking
//! consults this guard as a hard skip.

use uuid::Uuid;

use super::error::EngineResult;
use crate::store::SharedResultLock;

/// Predicate over the published-result signal
#[derive(Clone)]
pub struct ResultLockGuard {
    results: SharedResultLock,
}

impl ResultLockGuard {
    pub fn new(results: SharedResultLock) -> Self {
        Self { results }
    }

    /// True when the (event, category) pair is locked for reseeding.
    pub async fn is_locked(&self, event_id: Uuid, category_id: Uuid) -> EngineResult<bool> {
        Ok(self
            .results
            .has_published_results(event_id, category_id)
            .await?)
    }
}
