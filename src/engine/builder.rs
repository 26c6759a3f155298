//! Heat builder
//!
//! Creates heats from scratch for an event x category cross product: each
//! category's approved roster is split into lane-count chunks, every chunk
//! becomes one heat with the next global heat number, and start times are
//! seeded forward using the same interval-selection rule the calculator
//! applies between boundaries.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::calculator::{heat_duration, select_interval, ScheduleCalculator};
use super::error::{EngineError, EngineResult};
use crate::models::{Event, Heat, HeatEntry};
use crate::store::{SharedHeatStore, SharedRosterProvider, SharedScheduleStore};

/// Parameters for an initial build
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildRequest {
    /// Events to build for; empty means every event of the championship.
    pub event_ids: Vec<Uuid>,

    /// Categories to build for; empty means every category.
    pub category_ids: Vec<Uuid>,

    /// Lane count applied to every created heat.
    pub lane_count: u32,

    /// First-heat start; falls back to the championship start time.
    pub start_time: Option<NaiveDateTime>,
}

impl BuildRequest {
    pub fn new(lane_count: u32) -> Self {
        Self {
            lane_count,
            ..Self::default()
        }
    }

    /// Restrict the build to specific events.
    pub fn with_events(mut self, event_ids: Vec<Uuid>) -> Self {
        self.event_ids = event_ids;
        self
    }

    /// Restrict the build to specific categories.
    pub fn with_categories(mut self, category_ids: Vec<Uuid>) -> Self {
        self.category_ids = category_ids;
        self
    }

    /// Set the explicit start time.
    pub fn with_start_time(mut self, start_time: NaiveDateTime) -> Self {
        self.start_time = Some(start_time);
        self
    }
}

/// Outcome of an initial build
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildReport {
    pub heats_created: usize,
    pub entries_created: usize,
    /// Categories skipped for having no approved competitors.
    pub skipped_categories: Vec<Uuid>,
}

/// Creates heats and their initial entries
pub struct HeatBuilder {
    schedule: SharedScheduleStore,
    heats: SharedHeatStore,
    roster: SharedRosterProvider,
}

impl HeatBuilder {
    pub fn new(
        schedule: SharedScheduleStore,
        heats: SharedHeatStore,
        roster: SharedRosterProvider,
    ) -> Self {
        Self {
            schedule,
            heats,
            roster,
        }
    }

    /// Build heats for the event x category cross product.
    ///
    /// Preconditions are checked before any write. A category with an empty
    /// roster skips its slice (logged, reported, not fatal); everything else
    /// is built and persisted in one pass.
    pub async fn build_initial_heats(
        &self,
        championship_id: Uuid,
        request: BuildRequest,
    ) -> EngineResult<BuildReport> {
        if request.lane_count == 0 {
            return Err(EngineError::InvalidLaneCount { given: 0 });
        }

        let championship = self
            .schedule
            .get_championship(championship_id)
            .await?
            .ok_or_else(|| EngineError::not_found("championship", championship_id))?;

        let events: Vec<_> = self
            .schedule
            .list_events(championship_id)
            .await?
            .into_iter()
            .filter(|e| request.event_ids.is_empty() || request.event_ids.contains(&e.id))
            .collect();
        let categories: Vec<_> = self
            .schedule
            .list_categories(championship_id)
            .await?
            .into_iter()
            .filter(|c| request.category_ids.is_empty() || request.category_ids.contains(&c.id))
            .collect();

        if events.is_empty() {
            return Err(EngineError::empty_selection("no events selected"));
        }
        if categories.is_empty() {
            return Err(EngineError::empty_selection("no categories selected"));
        }

        let start = request
            .start_time
            .or(championship.start_time)
            .ok_or(EngineError::MissingStartTime)?;

        let event_map: HashMap<Uuid, Event> =
            events.iter().cloned().map(|e| (e.id, e)).collect();
        let intervals = &championship.intervals;
        let mut heat_number = self.heats.max_heat_number(championship_id).await? + 1;

        let mut report = BuildReport::default();
        let mut new_heats: Vec<Heat> = Vec::new();
        let mut new_entries: Vec<(Uuid, Vec<HeatEntry>)> = Vec::new();

        for event in &events {
            for category in &categories {
                let roster = self.roster.approved_roster(category.id).await?;
                if roster.is_empty() {
                    tracing::warn!(
                        event = %event.name,
                        category = %category.name,
                        "no approved competitors, skipping slice"
                    );
                    if !report.skipped_categories.contains(&category.id) {
                        report.skipped_categories.push(category.id);
                    }
                    continue;
                }

                for chunk in roster.chunks(request.lane_count as usize) {
                    let mut heat = Heat::new(
                        championship_id,
                        event.id,
                        category.id,
                        heat_number,
                        request.lane_count,
                    );
                    heat_number += 1;

                    let time = match new_heats.last() {
                        None => start,
                        Some(prev) => {
                            prev.scheduled_time.expect("built heats are scheduled")
                                + heat_duration(prev, &event_map)
                                + select_interval(prev, &heat, &event_map, intervals)
                        }
                    };
                    heat.scheduled_time = Some(time);

                    let entries: Vec<HeatEntry> = chunk
                        .iter()
                        .enumerate()
                        .map(|(lane, registration)| {
                            HeatEntry::new(heat.id, registration.id, lane as u32 + 1)
                        })
                        .collect();

                    report.entries_created += entries.len();
                    new_entries.push((heat.id, entries));
                    new_heats.push(heat);
                }
            }
        }

        report.heats_created = new_heats.len();
        self.heats.insert_heats(&new_heats).await?;
        for (heat_id, entries) in &new_entries {
            self.heats.replace_entries(*heat_id, entries).await?;
        }

        tracing::info!(
            championship_id = %championship_id,
            heats = report.heats_created,
            entries = report.entries_created,
            skipped = report.skipped_categories.len(),
            "built initial heats"
        );
        Ok(report)
    }

    /// Append one heat with a pinned time, then shift every later heat so the
    /// schedule stays consistent.
    pub async fn add_single_heat(
        &self,
        championship_id: Uuid,
        event_id: Uuid,
        category_id: Uuid,
        lane_count: u32,
        scheduled_time: NaiveDateTime,
        custom_name: Option<String>,
    ) -> EngineResult<Heat> {
        if lane_count == 0 {
            return Err(EngineError::InvalidLaneCount { given: 0 });
        }
        self.schedule
            .get_event(event_id)
            .await?
            .ok_or_else(|| EngineError::not_found("event", event_id))?;
        self.schedule
            .get_category(category_id)
            .await?
            .ok_or_else(|| EngineError::not_found("category", category_id))?;

        let heat_number = self.heats.max_heat_number(championship_id).await? + 1;
        let mut heat = Heat::new(championship_id, event_id, category_id, heat_number, lane_count)
            .with_scheduled_time(scheduled_time)
            .with_manual_time(true);
        heat.custom_name = custom_name;

        self.heats.insert_heats(&[heat.clone()]).await?;

        ScheduleCalculator::new(self.schedule.clone(), self.heats.clone())
            .recalculate_following(heat.id)
            .await?;

        tracing::info!(heat = heat.heat_number, "added single heat");
        Ok(heat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Championship, Event, IntervalSettings, Registration};
    use crate::store::{create_memory_store, HeatFilter, HeatStore, MemoryStore, RosterProvider};
    use std::sync::Arc;

    fn at(time: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("2026-03-14T{time}:00"), "%Y-%m-%dT%H:%M:%S")
            .unwrap()
    }

    fn seeded(
        transition: i64,
        roster_size: usize,
    ) -> (Arc<MemoryStore>, Championship, Event, Category) {
        let store = create_memory_store();
        let championship = Championship::new("Test Games").with_intervals(IntervalSettings {
            transition_minutes: transition,
            category_interval_minutes: 5,
            event_interval_minutes: 10,
            day_breaks: Vec::new(),
        });
        store.insert_championship(championship.clone());

        let event = Event::new(championship.id, "Event 1", 1, 1).with_time_cap("10:00");
        store.insert_event(event.clone());
        let category = Category::new(championship.id, "RX", 1);
        store.insert_category(category.clone());

        for i in 0..roster_size {
            store.insert_registration(
                Registration::new(championship.id, category.id, format!("athlete-{i}"))
                    .with_order_index(i as i64 + 1),
            );
        }

        (store, championship, event, category)
    }

    fn builder(store: &Arc<MemoryStore>) -> HeatBuilder {
        HeatBuilder::new(store.clone(), store.clone(), store.clone())
    }

    #[tokio::test]
    async fn test_build_splits_roster_into_chunks() {
        // Scenario: 9 competitors, 4 lanes, 10:00 cap, 2 minute transition
        // from 09:00 gives heats of 4/4/1 at 09:00, 09:12, 09:24.
        let (store, championship, _, _) = seeded(2, 9);

        let report = builder(&store)
            .build_initial_heats(
                championship.id,
                BuildRequest::new(4).with_start_time(at("09:00")),
            )
            .await
            .unwrap();

        assert_eq!(report.heats_created, 3);
        assert_eq!(report.entries_created, 9);
        assert!(report.skipped_categories.is_empty());

        let heats = store
            .list_heats(championship.id, HeatFilter::all())
            .await
            .unwrap();
        assert_eq!(heats.len(), 3);
        assert_eq!(
            heats.iter().map(|h| h.heat_number).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(heats[0].scheduled_time, Some(at("09:00")));
        assert_eq!(heats[1].scheduled_time, Some(at("09:12")));
        assert_eq!(heats[2].scheduled_time, Some(at("09:24")));

        let sizes: Vec<usize> = {
            let mut sizes = Vec::new();
            for heat in &heats {
                sizes.push(store.list_entries(&[heat.id]).await.unwrap().len());
            }
            sizes
        };
        assert_eq!(sizes, vec![4, 4, 1]);

        // Seeding order: first chunk holds the top of the roster.
        let first = store.list_entries(&[heats[0].id]).await.unwrap();
        let names: Vec<String> = store
            .registrations(&first.iter().map(|e| e.registration_id).collect::<Vec<_>>())
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.competitor)
            .collect();
        assert!(names.contains(&"athlete-0".to_string()));
    }

    #[tokio::test]
    async fn test_build_rejects_zero_lanes() {
        let (store, championship, _, _) = seeded(2, 4);
        let err = builder(&store)
            .build_initial_heats(
                championship.id,
                BuildRequest::new(0).with_start_time(at("09:00")),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidLaneCount { given: 0 }));
    }

    #[tokio::test]
    async fn test_build_requires_start_time() {
        let (store, championship, _, _) = seeded(2, 4);
        let err = builder(&store)
            .build_initial_heats(championship.id, BuildRequest::new(4))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::MissingStartTime));

        // No heats written on a validation failure.
        let heats = store
            .list_heats(championship.id, HeatFilter::all())
            .await
            .unwrap();
        assert!(heats.is_empty());
    }

    #[tokio::test]
    async fn test_build_skips_empty_category() {
        let (store, championship, _, _) = seeded(2, 4);
        let empty = Category::new(championship.id, "Masters", 2);
        store.insert_category(empty.clone());

        let report = builder(&store)
            .build_initial_heats(
                championship.id,
                BuildRequest::new(4).with_start_time(at("09:00")),
            )
            .await
            .unwrap();

        assert_eq!(report.heats_created, 1);
        assert_eq!(report.skipped_categories, vec![empty.id]);
    }

    #[tokio::test]
    async fn test_build_category_boundary_spacing() {
        let (store, championship, _, category) = seeded(2, 4);
        let scaled = Category::new(championship.id, "Scaled", 2);
        store.insert_category(scaled.clone());
        for i in 0..4 {
            store.insert_registration(
                Registration::new(championship.id, scaled.id, format!("scaled-{i}"))
                    .with_order_index(i as i64 + 1),
            );
        }

        builder(&store)
            .build_initial_heats(
                championship.id,
                BuildRequest::new(4).with_start_time(at("09:00")),
            )
            .await
            .unwrap();

        let heats = store
            .list_heats(championship.id, HeatFilter::all())
            .await
            .unwrap();
        assert_eq!(heats.len(), 2);
        assert_eq!(heats[0].category_id, category.id);
        // Category boundary: 09:00 + 10:00 cap + 5 category interval.
        assert_eq!(heats[1].scheduled_time, Some(at("09:15")));
    }

    #[tokio::test]
    async fn test_add_single_heat_appends_and_shifts() {
        let (store, championship, event, category) = seeded(2, 8);

        builder(&store)
            .build_initial_heats(
                championship.id,
                BuildRequest::new(4).with_start_time(at("09:00")),
            )
            .await
            .unwrap();

        let added = builder(&store)
            .add_single_heat(
                championship.id,
                event.id,
                category.id,
                6,
                at("08:00"),
                Some("Showcase".into()),
            )
            .await
            .unwrap();

        assert_eq!(added.heat_number, 3);
        assert!(added.manual_time);
        assert_eq!(added.capacity, 6);

        let stored = store.get_heat(added.id).await.unwrap().unwrap();
        assert_eq!(stored.custom_name.as_deref(), Some("Showcase"));
        assert_eq!(stored.scheduled_time, Some(at("08:00")));
    }

    #[tokio::test]
    async fn test_add_single_heat_unknown_event() {
        let (store, championship, _, category) = seeded(2, 4);
        let err = builder(&store)
            .add_single_heat(
                championship.id,
                Uuid::new_v4(),
                category.id,
                4,
                at("09:00"),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { entity: "event", .. }));
    }
}
