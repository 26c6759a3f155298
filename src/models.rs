// Core data structures for the heatline scheduling engine

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

lazy_static! {
    static ref TIME_CAP_RE: Regex = Regex::new(r"^(\d{1,3}):([0-5]\d)$").unwrap();
}

/// Default heat duration when an event has no parseable time cap (10:00).
pub const DEFAULT_TIME_CAP_SECS: i64 = 600;

/// Parse a `MM:SS` time cap into a duration.
///
/// Returns `None` for anything that is not a well-formed `MM:SS` string;
/// callers fall back to [`DEFAULT_TIME_CAP_SECS`].
pub fn parse_time_cap(value: &str) -> Option<Duration> {
    let caps = TIME_CAP_RE.captures(value.trim())?;
    let minutes: i64 = caps[1].parse().ok()?;
    let seconds: i64 = caps[2].parse().ok()?;
    Some(Duration::seconds(minutes * 60 + seconds))
}

/// Tenant root: one championship with its interval configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Championship {
    pub id: Uuid,
    pub name: String,
    /// First-heat anchor for day one; `None` means no default start.
    pub start_time: Option<NaiveDateTime>,
    pub intervals: IntervalSettings,
}

impl Championship {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            start_time: None,
            intervals: IntervalSettings::default(),
        }
    }

    /// Set the day-one start time.
    pub fn with_start_time(mut self, start_time: NaiveDateTime) -> Self {
        self.start_time = Some(start_time);
        self
    }

    /// Set the interval configuration.
    pub fn with_intervals(mut self, intervals: IntervalSettings) -> Self {
        self.intervals = intervals;
        self
    }
}

/// Per-championship interval configuration consumed by the schedule walk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntervalSettings {
    /// Gap between consecutive heats of the same event and category.
    pub transition_minutes: i64,

    /// Gap at a category boundary within one event; 0 falls back to transition.
    pub category_interval_minutes: i64,

    /// Gap at an event boundary; 0 falls back to transition.
    pub event_interval_minutes: i64,

    /// Optional mid-day breaks, keyed by day and event position.
    pub day_breaks: Vec<DayBreak>,
}

impl Default for IntervalSettings {
    fn default() -> Self {
        Self {
            transition_minutes: 2,
            category_interval_minutes: 0,
            event_interval_minutes: 0,
            day_breaks: Vec::new(),
        }
    }
}

impl IntervalSettings {
    /// Category-boundary gap with the zero-value fallback applied.
    ///
    /// The configured zero is preserved in storage; the fallback only exists
    /// at calculation time.
    pub fn effective_category_interval(&self) -> i64 {
        if self.category_interval_minutes > 0 {
            self.category_interval_minutes
        } else {
            self.transition_minutes
        }
    }

    /// Event-boundary gap with the zero-value fallback applied.
    pub fn effective_event_interval(&self) -> i64 {
        if self.event_interval_minutes > 0 {
            self.event_interval_minutes
        } else {
            self.transition_minutes
        }
    }

    /// Break duration to insert after the event at `position` on `day`, if an
    /// enabled break is configured there.
    pub fn break_after(&self, day: u32, position: u32) -> Option<i64> {
        self.day_breaks
            .iter()
            .find(|b| b.enabled && b.day == day && b.after_event_position == position)
            .map(|b| b.duration_minutes)
    }
}

/// A configured mid-day break (lunch, venue reset).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayBreak {
    /// 1-based competition day.
    pub day: u32,
    /// Event position (within the day) after which the break is inserted.
    pub after_event_position: u32,
    pub duration_minutes: i64,
    pub enabled: bool,
}

/// One competitive task within a championship (a workout, a race segment).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub championship_id: Uuid,
    pub name: String,
    /// 1-based competition day.
    pub day: u32,
    /// Ordinal within the day; drives configured event order.
    pub position: u32,
    /// `MM:SS` time cap; `None` or unparseable means 10:00.
    pub time_cap: Option<String>,
}

impl Event {
    pub fn new(championship_id: Uuid, name: impl Into<String>, day: u32, position: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            championship_id,
            name: name.into(),
            day,
            position,
            time_cap: None,
        }
    }

    /// Set the `MM:SS` time cap.
    pub fn with_time_cap(mut self, cap: impl Into<String>) -> Self {
        self.time_cap = Some(cap.into());
        self
    }

    /// Heat duration for this event: parsed time cap, default 10:00.
    pub fn duration(&self) -> Duration {
        self.time_cap
            .as_deref()
            .and_then(parse_time_cap)
            .unwrap_or_else(|| Duration::seconds(DEFAULT_TIME_CAP_SECS))
    }
}

/// A competitor grouping with its own roster and seeding order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub championship_id: Uuid,
    pub name: String,
    /// Configured ordering among the championship's categories.
    pub position: u32,
}

impl Category {
    pub fn new(championship_id: Uuid, name: impl Into<String>, position: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            championship_id,
            name: name.into(),
            position,
        }
    }
}

/// One approved competitor or team (read-mostly from the engine's view).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub id: Uuid,
    pub championship_id: Uuid,
    pub category_id: Uuid,
    /// Display name of the athlete or team.
    pub competitor: String,
    /// Manual seed / current rank; rank 1 is the leader. `None` sorts last.
    pub order_index: Option<i64>,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

impl Registration {
    pub fn new(championship_id: Uuid, category_id: Uuid, competitor: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            championship_id,
            category_id,
            competitor: competitor.into(),
            order_index: None,
            approved: true,
            created_at: Utc::now(),
        }
    }

    /// Set the manual seeding rank.
    pub fn with_order_index(mut self, index: i64) -> Self {
        self.order_index = Some(index);
        self
    }

    /// Set the approval flag.
    pub fn with_approved(mut self, approved: bool) -> Self {
        self.approved = approved;
        self
    }
}

/// One scheduled unit of competition: a group racing the same event together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Heat {
    pub id: Uuid,
    pub championship_id: Uuid,
    pub event_id: Uuid,
    /// Nominal category; intercalation may place other categories' entries.
    pub category_id: Uuid,
    /// Global monotonic ordering key, unique per championship.
    pub heat_number: i64,
    /// Lane count; mutable per heat.
    pub capacity: u32,
    /// Wall-clock start; `None` means not yet scheduled.
    pub scheduled_time: Option<NaiveDateTime>,
    /// Operator-pinned time: the schedule walk treats it as an anchor and
    /// never rewrites it.
    #[serde(default)]
    pub manual_time: bool,
    pub custom_name: Option<String>,
}

impl Heat {
    pub fn new(
        championship_id: Uuid,
        event_id: Uuid,
        category_id: Uuid,
        heat_number: i64,
        capacity: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            championship_id,
            event_id,
            category_id,
            heat_number,
            capacity,
            scheduled_time: None,
            manual_time: false,
            custom_name: None,
        }
    }

    /// Set the scheduled start time.
    pub fn with_scheduled_time(mut self, time: NaiveDateTime) -> Self {
        self.scheduled_time = Some(time);
        self
    }

    /// Pin the scheduled time against recalculation.
    pub fn with_manual_time(mut self, manual: bool) -> Self {
        self.manual_time = manual;
        self
    }

    /// Set the display-name override.
    pub fn with_custom_name(mut self, name: impl Into<String>) -> Self {
        self.custom_name = Some(name.into());
        self
    }

    /// Display name: custom override or "Heat N".
    pub fn display_name(&self) -> String {
        match &self.custom_name {
            Some(name) => name.clone(),
            None => format!("Heat {}", self.heat_number),
        }
    }

    /// End of this heat given its event's duration.
    pub fn end_time(&self, duration: Duration) -> Option<NaiveDateTime> {
        self.scheduled_time.map(|t| t + duration)
    }
}

/// One competitor's placement inside one heat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeatEntry {
    pub id: Uuid,
    pub heat_id: Uuid,
    pub registration_id: Uuid,
    /// 1-based lane; unique within a heat.
    pub lane_number: u32,
}

impl HeatEntry {
    pub fn new(heat_id: Uuid, registration_id: Uuid, lane_number: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            heat_id,
            registration_id,
            lane_number,
        }
    }
}

/// A result record; any published row locks its (event, category) pair
/// against automatic reseeding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishedResult {
    pub id: Uuid,
    pub event_id: Uuid,
    pub category_id: Uuid,
    pub registration_id: Option<Uuid>,
    pub is_published: bool,
}

impl PublishedResult {
    pub fn new(event_id: Uuid, category_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id,
            category_id,
            registration_id: None,
            is_published: true,
        }
    }
}
