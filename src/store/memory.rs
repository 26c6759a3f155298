//! In-memory store for tests and fixtures
//!
//! Mirrors the SQLite backend's behavior exactly (ordering, cascade delete,
//! atomic per-heat entry replacement) without touching disk. Seeding goes
//! through the inherent `insert_*` / `publish_result` methods; the engine
//! only ever sees the trait surface.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    Category, Championship, Event, Heat, HeatEntry, IntervalSettings, PublishedResult,
    Registration,
};

use super::{
    seed_order, HeatFilter, HeatStore, ResultLock, RosterProvider, ScheduleStore, StoreResult,
};

#[derive(Default)]
struct Inner {
    championships: HashMap<Uuid, Championship>,
    events: HashMap<Uuid, Event>,
    categories: HashMap<Uuid, Category>,
    registrations: HashMap<Uuid, Registration>,
    heats: HashMap<Uuid, Heat>,
    entries: HashMap<Uuid, HeatEntry>,
    results: Vec<PublishedResult>,
}

/// In-memory implementation of all four store traits
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    pub fn insert_championship(&self, championship: Championship) {
        let mut inner = self.inner.write().unwrap();
        inner.championships.insert(championship.id, championship);
    }

    pub fn insert_event(&self, event: Event) {
        let mut inner = self.inner.write().unwrap();
        inner.events.insert(event.id, event);
    }

    pub fn insert_category(&self, category: Category) {
        let mut inner = self.inner.write().unwrap();
        inner.categories.insert(category.id, category);
    }

    pub fn insert_registration(&self, registration: Registration) {
        let mut inner = self.inner.write().unwrap();
        inner.registrations.insert(registration.id, registration);
    }

    /// Record a published result, locking the (event, category) pair.
    pub fn publish_result(&self, result: PublishedResult) {
        let mut inner = self.inner.write().unwrap();
        inner.results.push(result);
    }

    /// Total number of stored entries, across all heats.
    pub fn entry_count(&self) -> usize {
        self.inner.read().unwrap().entries.len()
    }

    /// Drop everything.
    pub fn clear(&self) {
        let mut inner = self.inner.write().unwrap();
        *inner = Inner::default();
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScheduleStore for MemoryStore {
    async fn get_championship(&self, id: Uuid) -> StoreResult<Option<Championship>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.championships.get(&id).cloned())
    }

    async fn list_events(&self, championship_id: Uuid) -> StoreResult<Vec<Event>> {
        let inner = self.inner.read().unwrap();
        let mut events: Vec<_> = inner
            .events
            .values()
            .filter(|e| e.championship_id == championship_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| (e.day, e.position));
        Ok(events)
    }

    async fn list_categories(&self, championship_id: Uuid) -> StoreResult<Vec<Category>> {
        let inner = self.inner.read().unwrap();
        let mut categories: Vec<_> = inner
            .categories
            .values()
            .filter(|c| c.championship_id == championship_id)
            .cloned()
            .collect();
        categories.sort_by_key(|c| c.position);
        Ok(categories)
    }

    async fn get_event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.events.get(&id).cloned())
    }

    async fn get_category(&self, id: Uuid) -> StoreResult<Option<Category>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.categories.get(&id).cloned())
    }

    async fn intervals(&self, championship_id: Uuid) -> StoreResult<IntervalSettings> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .championships
            .get(&championship_id)
            .map(|c| c.intervals.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl HeatStore for MemoryStore {
    async fn insert_heats(&self, heats: &[Heat]) -> StoreResult<()> {
        let mut inner = self.inner.write().unwrap();
        for heat in heats {
            inner.heats.insert(heat.id, heat.clone());
        }
        Ok(())
    }

    async fn get_heat(&self, id: Uuid) -> StoreResult<Option<Heat>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.heats.get(&id).cloned())
    }

    async fn list_heats(
        &self,
        championship_id: Uuid,
        filter: HeatFilter,
    ) -> StoreResult<Vec<Heat>> {
        let inner = self.inner.read().unwrap();
        let mut heats: Vec<_> = inner
            .heats
            .values()
            .filter(|h| h.championship_id == championship_id && filter.matches(h))
            .cloned()
            .collect();
        heats.sort_by_key(|h| h.heat_number);
        Ok(heats)
    }

    async fn update_heats(&self, heats: &[Heat]) -> StoreResult<()> {
        let mut inner = self.inner.write().unwrap();
        for heat in heats {
            inner.heats.insert(heat.id, heat.clone());
        }
        Ok(())
    }

    async fn delete_heat(&self, id: Uuid) -> StoreResult<bool> {
        let mut inner = self.inner.write().unwrap();
        let existed = inner.heats.remove(&id).is_some();
        if existed {
            inner.entries.retain(|_, e| e.heat_id != id);
        }
        Ok(existed)
    }

    async fn max_heat_number(&self, championship_id: Uuid) -> StoreResult<i64> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .heats
            .values()
            .filter(|h| h.championship_id == championship_id)
            .map(|h| h.heat_number)
            .max()
            .unwrap_or(0))
    }

    async fn get_entry(&self, id: Uuid) -> StoreResult<Option<HeatEntry>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.entries.get(&id).cloned())
    }

    async fn list_entries(&self, heat_ids: &[Uuid]) -> StoreResult<Vec<HeatEntry>> {
        let inner = self.inner.read().unwrap();
        let order: HashMap<Uuid, usize> =
            heat_ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        let mut entries: Vec<_> = inner
            .entries
            .values()
            .filter(|e| order.contains_key(&e.heat_id))
            .cloned()
            .collect();
        entries.sort_by_key(|e| (order[&e.heat_id], e.lane_number));
        Ok(entries)
    }

    async fn replace_entries(&self, heat_id: Uuid, entries: &[HeatEntry]) -> StoreResult<()> {
        let mut inner = self.inner.write().unwrap();
        inner.entries.retain(|_, e| e.heat_id != heat_id);
        for entry in entries {
            debug_assert_eq!(entry.heat_id, heat_id);
            inner.entries.insert(entry.id, entry.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl RosterProvider for MemoryStore {
    async fn approved_roster(&self, category_id: Uuid) -> StoreResult<Vec<Registration>> {
        let inner = self.inner.read().unwrap();
        let mut roster: Vec<_> = inner
            .registrations
            .values()
            .filter(|r| r.category_id == category_id && r.approved)
            .cloned()
            .collect();
        seed_order(&mut roster);
        Ok(roster)
    }

    async fn registrations(&self, ids: &[Uuid]) -> StoreResult<Vec<Registration>> {
        let inner = self.inner.read().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| inner.registrations.get(id).cloned())
            .collect())
    }
}

#[async_trait]
impl ResultLock for MemoryStore {
    async fn has_published_results(
        &self,
        event_id: Uuid,
        category_id: Uuid,
    ) -> StoreResult<bool> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .results
            .iter()
            .any(|r| r.event_id == event_id && r.category_id == category_id && r.is_published))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_roster_ordering() {
        let store = MemoryStore::new();
        let championship = Uuid::new_v4();
        let category = Uuid::new_v4();

        let base = Utc::now();
        let mut early = Registration::new(championship, category, "no-seed-early");
        early.created_at = base;
        let mut late = Registration::new(championship, category, "no-seed-late");
        late.created_at = base + Duration::seconds(5);
        let seeded_two = Registration::new(championship, category, "seed-2").with_order_index(2);
        let seeded_one = Registration::new(championship, category, "seed-1").with_order_index(1);
        let unapproved =
            Registration::new(championship, category, "pending").with_approved(false);

        store.insert_registration(late.clone());
        store.insert_registration(seeded_two);
        store.insert_registration(early.clone());
        store.insert_registration(seeded_one);
        store.insert_registration(unapproved);

        let roster = store.approved_roster(category).await.unwrap();
        let names: Vec<_> = roster.iter().map(|r| r.competitor.as_str()).collect();
        assert_eq!(names, vec!["seed-1", "seed-2", "no-seed-early", "no-seed-late"]);
    }

    #[tokio::test]
    async fn test_heat_cascade_delete() {
        let store = MemoryStore::new();
        let championship = Uuid::new_v4();
        let heat = Heat::new(championship, Uuid::new_v4(), Uuid::new_v4(), 1, 4);
        let heat_id = heat.id;
        store.insert_heats(&[heat]).await.unwrap();
        store
            .replace_entries(
                heat_id,
                &[
                    HeatEntry::new(heat_id, Uuid::new_v4(), 1),
                    HeatEntry::new(heat_id, Uuid::new_v4(), 2),
                ],
            )
            .await
            .unwrap();
        assert_eq!(store.entry_count(), 2);

        assert!(store.delete_heat(heat_id).await.unwrap());
        assert_eq!(store.entry_count(), 0);
        assert!(!store.delete_heat(heat_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_max_heat_number_empty() {
        let store = MemoryStore::new();
        assert_eq!(store.max_heat_number(Uuid::new_v4()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_result_lock_signal() {
        let store = MemoryStore::new();
        let event = Uuid::new_v4();
        let category = Uuid::new_v4();

        assert!(!store.has_published_results(event, category).await.unwrap());

        let mut unpublished = PublishedResult::new(event, category);
        unpublished.is_published = false;
        store.publish_result(unpublished);
        assert!(!store.has_published_results(event, category).await.unwrap());

        store.publish_result(PublishedResult::new(event, category));
        assert!(store.has_published_results(event, category).await.unwrap());
    }
}
