//! Assignment engine
//!
//! Mutates heat membership in three modes:
//!
//! - [`AssignmentEngine::move_entry`] - one competitor between two heats, or
//!   a reorder within one heat (the typed replacement for drag and drop)
//! - [`AssignmentEngine::reseed_by_ranking`] - rebuild a (event, category)
//!   pair's entries from current standings, skipping pairs with published
//!   results
//! - [`AssignmentEngine::intercalate`] - redistribute one event's entries
//!   across its own heats to fill empty lanes, mixing categories when needed
//!
//! None of these touch `scheduled_time`; lane numbers always compact to a
//! dense 1..N after any rewrite.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{EngineError, EngineResult};
use super::guard::ResultLockGuard;
use crate::models::{Heat, HeatEntry};
use crate::store::{
    HeatFilter, SharedHeatStore, SharedRosterProvider, SharedScheduleStore,
};

/// Rewrite lane numbers to a dense 1..N in current order.
fn compact_lanes(entries: &mut [HeatEntry]) {
    for (index, entry) in entries.iter_mut().enumerate() {
        entry.lane_number = index as u32 + 1;
    }
}

/// Outcome of reseeding one (event, category) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReseedOutcome {
    /// Entries rebuilt from current standings
    Reseeded {
        heats: usize,
        placed: usize,
        /// Competitors beyond the pair's total capacity, left out.
        unplaced: usize,
    },
    /// Pair has published results; membership left untouched
    SkippedLocked,
    /// Pair has no heats or no approved roster
    SkippedEmpty,
}

/// Outcome of intercalating one event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntercalationReport {
    pub heats: usize,
    pub entries: usize,
    /// Entries that ended up in a different heat than before.
    pub moved: usize,
    /// Heats that now hold more than one category.
    pub mixed_heats: usize,
}

/// Mutates heat membership under the capacity, uniqueness, and lock rules
pub struct AssignmentEngine {
    schedule: SharedScheduleStore,
    heats: SharedHeatStore,
    roster: SharedRosterProvider,
    guard: ResultLockGuard,
}

impl AssignmentEngine {
    pub fn new(
        schedule: SharedScheduleStore,
        heats: SharedHeatStore,
        roster: SharedRosterProvider,
        guard: ResultLockGuard,
    ) -> Self {
        Self {
            schedule,
            heats,
            roster,
            guard,
        }
    }

    /// Move one entry to `target_heat_id` at the 1-based `target_lane_index`.
    ///
    /// A same-heat call reorders lanes. A cross-heat call requires a free
    /// lane in the target and no other entry for the same registration
    /// anywhere in the target's event; on any rejection both heats are left
    /// exactly as they were.
    pub async fn move_entry(
        &self,
        entry_id: Uuid,
        target_heat_id: Uuid,
        target_lane_index: u32,
    ) -> EngineResult<()> {
        let entry = self
            .heats
            .get_entry(entry_id)
            .await?
            .ok_or_else(|| EngineError::not_found("entry", entry_id))?;
        let target = self
            .heats
            .get_heat(target_heat_id)
            .await?
            .ok_or_else(|| EngineError::not_found("heat", target_heat_id))?;

        let index = (target_lane_index.max(1) - 1) as usize;

        if entry.heat_id == target_heat_id {
            let mut entries = self.heats.list_entries(&[target_heat_id]).await?;
            let position = entries
                .iter()
                .position(|e| e.id == entry.id)
                .ok_or_else(|| EngineError::not_found("entry", entry.id))?;
            let moving = entries.remove(position);
            let index = index.min(entries.len());
            entries.insert(index, moving);
            compact_lanes(&mut entries);
            self.heats.replace_entries(target_heat_id, &entries).await?;

            tracing::debug!(heat = target.heat_number, lane = index + 1, "reordered entry");
            return Ok(());
        }

        let source = self
            .heats
            .get_heat(entry.heat_id)
            .await?
            .ok_or_else(|| EngineError::not_found("heat", entry.heat_id))?;

        let mut target_entries = self.heats.list_entries(&[target_heat_id]).await?;
        if target_entries.len() >= target.capacity as usize {
            return Err(EngineError::HeatFull {
                heat_number: target.heat_number,
                capacity: target.capacity,
            });
        }

        // Single occupancy per event: the registration must not already sit
        // in any heat of the target's event.
        let event_heats = self
            .heats
            .list_heats(target.championship_id, HeatFilter::for_event(target.event_id))
            .await?;
        let event_heat_ids: Vec<Uuid> = event_heats.iter().map(|h| h.id).collect();
        let event_entries = self.heats.list_entries(&event_heat_ids).await?;
        if event_entries
            .iter()
            .any(|e| e.registration_id == entry.registration_id && e.id != entry.id)
        {
            return Err(EngineError::DuplicateEntry {
                registration_id: entry.registration_id,
            });
        }

        let mut source_entries = self.heats.list_entries(&[source.id]).await?;
        source_entries.retain(|e| e.id != entry.id);
        compact_lanes(&mut source_entries);

        let index = index.min(target_entries.len());
        target_entries.insert(
            index,
            HeatEntry::new(target.id, entry.registration_id, 0),
        );
        compact_lanes(&mut target_entries);

        // Move is delete + insert, per heat; never an in-place heat_id edit.
        self.heats.replace_entries(source.id, &source_entries).await?;
        self.heats.replace_entries(target.id, &target_entries).await?;

        tracing::info!(
            registration = %entry.registration_id,
            from = source.heat_number,
            to = target.heat_number,
            lane = index + 1,
            "moved entry"
        );
        Ok(())
    }

    /// Rebuild a pair's entries from current standings.
    ///
    /// Heat count and capacities are preserved. The rank-ordered roster is
    /// reversed before chunking, so the current leader races in the last
    /// heat and the bottom ranks fill the first. Pairs with published
    /// results are skipped, never failed.
    pub async fn reseed_by_ranking(
        &self,
        event_id: Uuid,
        category_id: Uuid,
    ) -> EngineResult<ReseedOutcome> {
        if self.guard.is_locked(event_id, category_id).await? {
            tracing::info!(
                event_id = %event_id,
                category_id = %category_id,
                "pair has published results, reseed skipped"
            );
            return Ok(ReseedOutcome::SkippedLocked);
        }

        let event = self
            .schedule
            .get_event(event_id)
            .await?
            .ok_or_else(|| EngineError::not_found("event", event_id))?;
        let heats = self
            .heats
            .list_heats(
                event.championship_id,
                HeatFilter::for_pair(event_id, category_id),
            )
            .await?;
        if heats.is_empty() {
            return Ok(ReseedOutcome::SkippedEmpty);
        }

        let roster = self.roster.approved_roster(category_id).await?;
        if roster.is_empty() {
            return Ok(ReseedOutcome::SkippedEmpty);
        }

        // Rank 1 last: weaker performers race first, leaders close the show.
        let mut reversed = roster;
        reversed.reverse();

        let mut placed = 0;
        let mut cursor = reversed.iter();
        for heat in &heats {
            let chunk: Vec<HeatEntry> = cursor
                .by_ref()
                .take(heat.capacity as usize)
                .enumerate()
                .map(|(lane, registration)| {
                    HeatEntry::new(heat.id, registration.id, lane as u32 + 1)
                })
                .collect();
            placed += chunk.len();
            self.heats.replace_entries(heat.id, &chunk).await?;
        }

        let unplaced = cursor.count();
        if unplaced > 0 {
            tracing::warn!(
                event_id = %event_id,
                category_id = %category_id,
                unplaced,
                "roster exceeds heat capacity, leftover competitors unplaced"
            );
        }

        tracing::info!(
            event_id = %event_id,
            category_id = %category_id,
            heats = heats.len(),
            placed,
            "reseeded pair by ranking"
        );
        Ok(ReseedOutcome::Reseeded {
            heats: heats.len(),
            placed,
            unplaced,
        })
    }

    /// Reseed every category that has heats in the event.
    ///
    /// Locked and empty pairs are reported alongside reseeded ones; one
    /// pair's skip never stops the batch.
    pub async fn reseed_event(
        &self,
        event_id: Uuid,
    ) -> EngineResult<Vec<(Uuid, ReseedOutcome)>> {
        let event = self
            .schedule
            .get_event(event_id)
            .await?
            .ok_or_else(|| EngineError::not_found("event", event_id))?;
        let heats = self
            .heats
            .list_heats(event.championship_id, HeatFilter::for_event(event_id))
            .await?;

        let mut seen = HashSet::new();
        let mut outcomes = Vec::new();
        for heat in &heats {
            if !seen.insert(heat.category_id) {
                continue;
            }
            let outcome = self.reseed_by_ranking(event_id, heat.category_id).await?;
            outcomes.push((heat.category_id, outcome));
        }
        Ok(outcomes)
    }

    /// Redistribute one event's entries across its own heats to minimize
    /// empty lanes.
    ///
    /// Walking heats in ascending heat number, each heat fills to capacity
    /// taking unused entries of its own nominal category first, then any
    /// remaining entries from the event's other categories. Start times are
    /// never touched; entries never cross events.
    pub async fn intercalate(&self, event_id: Uuid) -> EngineResult<IntercalationReport> {
        let event = self
            .schedule
            .get_event(event_id)
            .await?
            .ok_or_else(|| EngineError::not_found("event", event_id))?;
        let heats = self
            .heats
            .list_heats(event.championship_id, HeatFilter::for_event(event_id))
            .await?;
        if heats.is_empty() {
            return Ok(IntercalationReport::default());
        }

        let heat_ids: Vec<Uuid> = heats.iter().map(|h| h.id).collect();
        let entries = self.heats.list_entries(&heat_ids).await?;

        let registrations = self
            .roster
            .registrations(&entries.iter().map(|e| e.registration_id).collect::<Vec<_>>())
            .await?;
        let category_of: HashMap<Uuid, Uuid> = registrations
            .iter()
            .map(|r| (r.id, r.category_id))
            .collect();
        let nominal_of: HashMap<Uuid, Uuid> =
            heats.iter().map(|h| (h.id, h.category_id)).collect();

        // Pool in heat order; each entry tagged with its competitor's
        // category (falling back to its heat's nominal category).
        struct Pooled {
            registration_id: Uuid,
            category_id: Uuid,
            original_heat_id: Uuid,
        }
        let pool: Vec<Pooled> = entries
            .iter()
            .map(|e| Pooled {
                registration_id: e.registration_id,
                category_id: category_of
                    .get(&e.registration_id)
                    .or_else(|| nominal_of.get(&e.heat_id))
                    .copied()
                    .unwrap_or(e.heat_id),
                original_heat_id: e.heat_id,
            })
            .collect();

        let mut used = vec![false; pool.len()];
        let mut report = IntercalationReport {
            heats: heats.len(),
            entries: pool.len(),
            ..Default::default()
        };

        for heat in &heats {
            let capacity = heat.capacity as usize;
            let mut picked: Vec<usize> = Vec::with_capacity(capacity);

            // Own category first, earlier heats get first claim.
            for (index, pooled) in pool.iter().enumerate() {
                if picked.len() == capacity {
                    break;
                }
                if !used[index] && pooled.category_id == heat.category_id {
                    used[index] = true;
                    picked.push(index);
                }
            }
            // Then fill the gap from other categories of the same event.
            for (index, pooled) in pool.iter().enumerate() {
                if picked.len() == capacity {
                    break;
                }
                if !used[index] && pooled.category_id != heat.category_id {
                    used[index] = true;
                    picked.push(index);
                }
            }

            let categories: HashSet<Uuid> =
                picked.iter().map(|&i| pool[i].category_id).collect();
            if categories.len() > 1 {
                report.mixed_heats += 1;
            }
            report.moved += picked
                .iter()
                .filter(|&&i| pool[i].original_heat_id != heat.id)
                .count();

            let mut new_entries: Vec<HeatEntry> = picked
                .iter()
                .map(|&i| HeatEntry::new(heat.id, pool[i].registration_id, 0))
                .collect();
            compact_lanes(&mut new_entries);
            self.heats.replace_entries(heat.id, &new_entries).await?;
        }

        tracing::info!(
            event = %event.name,
            heats = report.heats,
            moved = report.moved,
            mixed = report.mixed_heats,
            "intercalated event"
        );
        Ok(report)
    }
}
