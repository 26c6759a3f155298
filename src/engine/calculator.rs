//! Schedule calculator
//!
//! Walks heats in a fixed order and assigns wall-clock start times, inserting
//! the configured transition / category / event intervals and day breaks at
//! each boundary. Two scopes exist and nothing else ever recomputes times:
//!
//! - [`ScheduleCalculator::recalculate_all`] - the whole championship, from
//!   the first heat's time or the configured day start
//! - [`ScheduleCalculator::recalculate_following`] - only heats after an
//!   edited heat, so an edit never perturbs earlier heats
//!
//! Both are idempotent: re-running without config or manual-time changes
//! produces identical timestamps.

use std::collections::HashMap;

use chrono::{Duration, NaiveDateTime};
use uuid::Uuid;

use super::error::{EngineError, EngineResult};
use crate::models::{Event, Heat, IntervalSettings, DEFAULT_TIME_CAP_SECS};
use crate::store::{HeatFilter, SharedHeatStore, SharedScheduleStore};

/// Sort heats into walk order: scheduled time ascending with unscheduled
/// heats last, ties broken by heat number.
pub(crate) fn sort_walk_order(heats: &mut [Heat]) {
    heats.sort_by(|a, b| match (a.scheduled_time, b.scheduled_time) {
        (Some(x), Some(y)) => x.cmp(&y).then(a.heat_number.cmp(&b.heat_number)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.heat_number.cmp(&b.heat_number),
    });
}

/// Duration of a heat: its event's time cap, default 10:00 when the event is
/// unknown.
pub(crate) fn heat_duration(heat: &Heat, events: &HashMap<Uuid, Event>) -> Duration {
    events
        .get(&heat.event_id)
        .map(Event::duration)
        .unwrap_or_else(|| Duration::seconds(DEFAULT_TIME_CAP_SECS))
}

/// Gap to insert between chronologically adjacent heats `prev` and `next`.
///
/// Event boundary wins over category boundary; a day break configured after
/// `prev`'s event stacks on top of the event interval. Zero-valued category
/// and event intervals fall back to the transition at this point only.
pub(crate) fn select_interval(
    prev: &Heat,
    next: &Heat,
    events: &HashMap<Uuid, Event>,
    intervals: &IntervalSettings,
) -> Duration {
    if prev.event_id != next.event_id {
        let mut minutes = intervals.effective_event_interval();
        if let Some(event) = events.get(&prev.event_id) {
            if let Some(break_minutes) = intervals.break_after(event.day, event.position) {
                minutes += break_minutes;
            }
        }
        Duration::minutes(minutes)
    } else if prev.category_id != next.category_id {
        Duration::minutes(intervals.effective_category_interval())
    } else {
        Duration::minutes(intervals.transition_minutes)
    }
}

/// Computes and persists heat start times
pub struct ScheduleCalculator {
    schedule: SharedScheduleStore,
    heats: SharedHeatStore,
}

impl ScheduleCalculator {
    pub fn new(schedule: SharedScheduleStore, heats: SharedHeatStore) -> Self {
        Self { schedule, heats }
    }

    /// Recalculate every heat of a championship.
    ///
    /// Anchor is the first heat's existing time, else the championship start
    /// time; with neither this is a no-op (the engine never guesses a start).
    /// Returns the number of heats whose time changed.
    pub async fn recalculate_all(&self, championship_id: Uuid) -> EngineResult<usize> {
        let championship = self
            .schedule
            .get_championship(championship_id)
            .await?
            .ok_or_else(|| EngineError::not_found("championship", championship_id))?;

        let mut heats = self
            .heats
            .list_heats(championship_id, HeatFilter::all())
            .await?;
        if heats.is_empty() {
            return Ok(0);
        }

        sort_walk_order(&mut heats);

        let anchor = match heats[0].scheduled_time.or(championship.start_time) {
            Some(anchor) => anchor,
            None => {
                tracing::debug!(
                    championship_id = %championship_id,
                    "no anchor and no configured start time, skipping recalculation"
                );
                return Ok(0);
            }
        };

        let events = self.event_map(championship_id).await?;
        let changed = Self::walk(&mut heats, anchor, &events, &championship.intervals);
        self.persist(&heats, &changed).await?;

        tracing::info!(
            championship_id = %championship_id,
            heats = heats.len(),
            changed = changed.len(),
            "recalculated full schedule"
        );
        Ok(changed.len())
    }

    /// Recalculate only the heats after an edited heat.
    ///
    /// The walk starts at the edited heat's end time and touches heats with a
    /// strictly greater heat number; earlier heats are never perturbed.
    pub async fn recalculate_following(&self, edited_heat_id: Uuid) -> EngineResult<usize> {
        let edited = self
            .heats
            .get_heat(edited_heat_id)
            .await?
            .ok_or_else(|| EngineError::not_found("heat", edited_heat_id))?;

        if edited.scheduled_time.is_none() {
            return Err(EngineError::UnscheduledAnchor {
                heat_number: edited.heat_number,
            });
        }

        let intervals = self.schedule.intervals(edited.championship_id).await?;
        let events = self.event_map(edited.championship_id).await?;

        let mut following: Vec<Heat> = self
            .heats
            .list_heats(edited.championship_id, HeatFilter::all())
            .await?
            .into_iter()
            .filter(|h| h.heat_number > edited.heat_number)
            .collect();
        following.sort_by_key(|h| h.heat_number);

        let origin_number = edited.heat_number;
        let mut changed = Vec::new();
        let mut prev = edited;
        for (index, heat) in following.iter_mut().enumerate() {
            // Pinned heats are anchors, never rewritten.
            if heat.manual_time && heat.scheduled_time.is_some() {
                prev = heat.clone();
                continue;
            }

            let expected = prev.scheduled_time.expect("walk anchor always scheduled")
                + heat_duration(&prev, &events)
                + select_interval(&prev, heat, &events, &intervals);
            if heat.scheduled_time != Some(expected) {
                heat.scheduled_time = Some(expected);
                changed.push(index);
            }
            prev = heat.clone();
        }

        self.persist(&following, &changed).await?;

        tracing::info!(
            heat = origin_number,
            changed = changed.len(),
            "recalculated heats after edit"
        );
        Ok(changed.len())
    }

    /// Forward walk over heats already in walk order. The first heat is set
    /// to the anchor; each later heat follows its predecessor's end plus the
    /// selected interval, unless its time is pinned. Returns changed indices.
    fn walk(
        heats: &mut [Heat],
        anchor: NaiveDateTime,
        events: &HashMap<Uuid, Event>,
        intervals: &IntervalSettings,
    ) -> Vec<usize> {
        let mut changed = Vec::new();

        if heats[0].scheduled_time != Some(anchor) {
            heats[0].scheduled_time = Some(anchor);
            changed.push(0);
        }

        let mut prev = heats[0].clone();
        for (index, heat) in heats.iter_mut().enumerate().skip(1) {
            if heat.manual_time && heat.scheduled_time.is_some() {
                prev = heat.clone();
                continue;
            }

            let expected = prev.scheduled_time.expect("walk anchor always scheduled")
                + heat_duration(&prev, events)
                + select_interval(&prev, heat, events, intervals);
            if heat.scheduled_time != Some(expected) {
                heat.scheduled_time = Some(expected);
                changed.push(index);
            }
            prev = heat.clone();
        }

        changed
    }

    async fn event_map(&self, championship_id: Uuid) -> EngineResult<HashMap<Uuid, Event>> {
        let events = self.schedule.list_events(championship_id).await?;
        Ok(events.into_iter().map(|e| (e.id, e)).collect())
    }

    /// Persist only the heats whose time changed.
    async fn persist(&self, heats: &[Heat], changed: &[usize]) -> EngineResult<()> {
        if changed.is_empty() {
            return Ok(());
        }
        let updates: Vec<Heat> = changed.iter().map(|&i| heats[i].clone()).collect();
        self.heats.update_heats(&updates).await?;
        Ok(())
    }
}
