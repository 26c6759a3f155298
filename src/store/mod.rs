//! Storage boundary for the scheduling engine
//!
//! The engine never talks to a database directly; it goes through the four
//! traits below, which mirror the external contracts of the system:
//!
//! - [`ScheduleStore`] - championships, events, categories, interval config
//! - [`HeatStore`] - heats and heat entries (the authoritative records)
//! - [`RosterProvider`] - ordered approved rosters per category
//! - [`ResultLock`] - the published-result signal behind the reseed lock
//!
//! Two backends implement all four: [`SqliteStore`] for production and
//! [`MemoryStore`] for tests and fixtures. Swapping backends never changes
//! engine behavior; every invariant the engine imposes is expressed through
//! these traits.

pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Category, Championship, Event, Heat, HeatEntry, IntervalSettings, Registration,
};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by the storage layer
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying database failure
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Corrupt or unreadable stored value
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem failure while opening or preparing the database
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Referenced record does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },
}

impl StoreError {
    /// Create a not-found error for an entity.
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }
}

/// Filter for heat listings; empty filter means all heats of the championship.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeatFilter {
    pub event_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
}

impl HeatFilter {
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to one event.
    pub fn for_event(event_id: Uuid) -> Self {
        Self {
            event_id: Some(event_id),
            category_id: None,
        }
    }

    /// Restrict to one (event, category) pair.
    pub fn for_pair(event_id: Uuid, category_id: Uuid) -> Self {
        Self {
            event_id: Some(event_id),
            category_id: Some(category_id),
        }
    }

    /// Check a heat against the filter.
    pub fn matches(&self, heat: &Heat) -> bool {
        self.event_id.map_or(true, |e| heat.event_id == e)
            && self.category_id.map_or(true, |c| heat.category_id == c)
    }
}

/// Repository for championship-level configuration: events, categories,
/// interval settings.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Get a championship by id.
    async fn get_championship(&self, id: Uuid) -> StoreResult<Option<Championship>>;

    /// List a championship's events in configured order (day, then position).
    async fn list_events(&self, championship_id: Uuid) -> StoreResult<Vec<Event>>;

    /// List a championship's categories in configured order.
    async fn list_categories(&self, championship_id: Uuid) -> StoreResult<Vec<Category>>;

    /// Get a single event.
    async fn get_event(&self, id: Uuid) -> StoreResult<Option<Event>>;

    /// Get a single category.
    async fn get_category(&self, id: Uuid) -> StoreResult<Option<Category>>;

    /// Interval configuration for a championship.
    async fn intervals(&self, championship_id: Uuid) -> StoreResult<IntervalSettings>;
}

/// Repository for heats and their entries.
///
/// Entry moves are always delete + insert through [`replace_entries`]; the
/// store guarantees that a single heat's entry rewrite is atomic.
///
/// [`replace_entries`]: HeatStore::replace_entries
#[async_trait]
pub trait HeatStore: Send + Sync {
    /// Insert a batch of heats.
    async fn insert_heats(&self, heats: &[Heat]) -> StoreResult<()>;

    /// Get a heat by id.
    async fn get_heat(&self, id: Uuid) -> StoreResult<Option<Heat>>;

    /// List heats of a championship matching the filter, ordered by
    /// `heat_number` ascending.
    async fn list_heats(&self, championship_id: Uuid, filter: HeatFilter)
        -> StoreResult<Vec<Heat>>;

    /// Persist updated heat rows (times, capacity, numbering, names).
    async fn update_heats(&self, heats: &[Heat]) -> StoreResult<()>;

    /// Delete a heat and cascade to its entries. Returns whether it existed.
    async fn delete_heat(&self, id: Uuid) -> StoreResult<bool>;

    /// Highest `heat_number` in the championship; 0 when no heats exist.
    async fn max_heat_number(&self, championship_id: Uuid) -> StoreResult<i64>;

    /// Get a single entry by id.
    async fn get_entry(&self, id: Uuid) -> StoreResult<Option<HeatEntry>>;

    /// List entries for the given heats, ordered by (heat, lane).
    async fn list_entries(&self, heat_ids: &[Uuid]) -> StoreResult<Vec<HeatEntry>>;

    /// Atomically replace one heat's entries with the given set.
    async fn replace_entries(&self, heat_id: Uuid, entries: &[HeatEntry]) -> StoreResult<()>;
}

/// Supplier of ordered, approved rosters.
///
/// Ordering contract: `order_index` ascending with nulls last, ties broken by
/// `created_at` ascending. Unapproved registrations are excluded upstream.
#[async_trait]
pub trait RosterProvider: Send + Sync {
    /// Approved roster for a category, in seeding order.
    async fn approved_roster(&self, category_id: Uuid) -> StoreResult<Vec<Registration>>;

    /// Look up registrations by id (any category, any approval state).
    async fn registrations(&self, ids: &[Uuid]) -> StoreResult<Vec<Registration>>;
}

/// The published-result signal consulted by the result lock guard.
#[async_trait]
pub trait ResultLock: Send + Sync {
    /// True when any published result exists for the (event, category) pair.
    async fn has_published_results(&self, event_id: Uuid, category_id: Uuid)
        -> StoreResult<bool>;
}

// ============================================================================
// Shared Store Types
// ============================================================================

/// Thread-safe shared schedule store
pub type SharedScheduleStore = Arc<dyn ScheduleStore>;

/// Thread-safe shared heat store
pub type SharedHeatStore = Arc<dyn HeatStore>;

/// Thread-safe shared roster provider
pub type SharedRosterProvider = Arc<dyn RosterProvider>;

/// Thread-safe shared result lock source
pub type SharedResultLock = Arc<dyn ResultLock>;

/// Open a shared SQLite-backed store.
pub fn open_sqlite_store(path: impl AsRef<std::path::Path>) -> StoreResult<Arc<SqliteStore>> {
    Ok(Arc::new(SqliteStore::open(path)?))
}

/// Create a shared in-memory store.
pub fn create_memory_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

/// Sort registrations into seeding order: `order_index` ascending with nulls
/// last, then `created_at` ascending.
pub(crate) fn seed_order(roster: &mut [Registration]) {
    roster.sort_by(|a, b| {
        match (a.order_index, b.order_index) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        }
        .then_with(|| a.created_at.cmp(&b.created_at))
    });
}
