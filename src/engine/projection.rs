//! Read-only schedule projection
//!
//! The downstream consumers (public display, PDF export, TV dashboard) see
//! heats only through this projection, derived purely from stored records:
//! no extra engine state, safe to rebuild after every mutation.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::calculator::{heat_duration, sort_walk_order};
use super::error::EngineResult;
use crate::models::Event;
use crate::store::{HeatFilter, SharedHeatStore, SharedRosterProvider, SharedScheduleStore};

/// One occupied lane in a heat view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaneView {
    pub lane_number: u32,
    pub competitor: String,
    pub category_name: String,
}

/// One heat as shown to displays and exports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeatView {
    pub heat_number: i64,
    pub name: String,
    pub event_name: String,
    /// Nominal category of the heat.
    pub category_name: String,
    pub scheduled_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
    pub entries: Vec<LaneView>,
    /// Distinct categories actually racing in the heat, in lane order;
    /// more than one after intercalation.
    pub participant_categories: Vec<String>,
}

/// Builds display projections from the stored schedule
pub struct ScheduleProjection {
    schedule: SharedScheduleStore,
    heats: SharedHeatStore,
    roster: SharedRosterProvider,
}

impl ScheduleProjection {
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

    /// All heats of a championship in walk order, with lanes resolved to
    /// competitor names.
    pub async fn heat_views(&self, championship_id: Uuid) -> EngineResult<Vec<HeatView>> {
        let mut heats = self
            .heats
            .list_heats(championship_id, HeatFilter::all())
            .await?;
        sort_walk_order(&mut heats);

        let events: HashMap<Uuid, Event> = self
            .schedule
            .list_events(championship_id)
            .await?
            .into_iter()
            .map(|e| (e.id, e))
            .collect();
        let categories: HashMap<Uuid, String> = self
            .schedule
            .list_categories(championship_id)
            .await?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();

        let heat_ids: Vec<Uuid> = heats.iter().map(|h| h.id).collect();
        let entries = self.heats.list_entries(&heat_ids).await?;
        let registrations = self
            .roster
            .registrations(&entries.iter().map(|e| e.registration_id).collect::<Vec<_>>())
            .await?;
        let registration_of: HashMap<Uuid, _> =
            registrations.into_iter().map(|r| (r.id, r)).collect();

        let mut views = Vec::with_capacity(heats.len());
        for heat in &heats {
            let duration = heat_duration(heat, &events);

            let mut lanes = Vec::new();
            let mut participant_categories: Vec<String> = Vec::new();
            for entry in entries.iter().filter(|e| e.heat_id == heat.id) {
                let (competitor, category_name) = match registration_of.get(&entry.registration_id)
                {
                    Some(registration) => (
                        registration.competitor.clone(),
                        categories
                            .get(&registration.category_id)
                            .cloned()
                            .unwrap_or_default(),
                    ),
                    None => (String::new(), String::new()),
                };
                if !category_name.is_empty() && !participant_categories.contains(&category_name) {
                    participant_categories.push(category_name.clone());
                }
                lanes.push(LaneView {
                    lane_number: entry.lane_number,
                    competitor,
                    category_name,
                });
            }

            views.push(HeatView {
                heat_number: heat.heat_number,
                name: heat.display_name(),
                event_name: events
                    .get(&heat.event_id)
                    .map(|e| e.name.clone())
                    .unwrap_or_default(),
                category_name: categories
                    .get(&heat.category_id)
                    .cloned()
                    .unwrap_or_default(),
                scheduled_time: heat.scheduled_time,
                end_time: heat.end_time(duration),
                entries: lanes,
                participant_categories,
            });
        }

        Ok(views)
    }
}
