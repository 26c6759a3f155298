//! Shared fixtures for integration tests

use std::sync::Arc;

use chrono::NaiveDateTime;
use heatline::engine::{AssignmentEngine, HeatBuilder, ResultLockGuard, ScheduleCalculator};
use heatline::models::{Category, Championship, Event, IntervalSettings, Registration};
use heatline::store::{create_memory_store, MemoryStore};

pub fn at(time: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(&format!("2026-03-14T{time}:00"), "%Y-%m-%dT%H:%M:%S").unwrap()
}

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub championship: Championship,
}

impl Fixture {
    pub fn new(intervals: IntervalSettings) -> Self {
        let store = create_memory_store();
        let championship = Championship::new("Integration Games").with_intervals(intervals);
        store.insert_championship(championship.clone());
        Self {
            store,
            championship,
        }
    }

    pub fn event(&self, name: &str, day: u32, position: u32, cap: &str) -> Event {
        let event = Event::new(self.championship.id, name, day, position).with_time_cap(cap);
        self.store.insert_event(event.clone());
        event
    }

    pub fn category(&self, name: &str, position: u32) -> Category {
        let category = Category::new(self.championship.id, name, position);
        self.store.insert_category(category.clone());
        category
    }

    /// Seed `count` approved registrations ranked 1..count.
    pub fn roster(&self, category: &Category, count: usize) -> Vec<Registration> {
        (0..count)
            .map(|i| {
                let registration = Registration::new(
                    self.championship.id,
                    category.id,
                    format!("{}-{}", category.name.to_lowercase(), i + 1),
                )
                .with_order_index(i as i64 + 1);
                self.store.insert_registration(registration.clone());
                registration
            })
            .collect()
    }

    pub fn builder(&self) -> HeatBuilder {
        HeatBuilder::new(self.store.clone(), self.store.clone(), self.store.clone())
    }

    #[allow(dead_code)]
    pub fn calculator(&self) -> ScheduleCalculator {
        ScheduleCalculator::new(self.store.clone(), self.store.clone())
    }

    pub fn assignment(&self) -> AssignmentEngine {
        AssignmentEngine::new(
            self.store.clone(),
            self.store.clone(),
            self.store.clone(),
            ResultLockGuard::new(self.store.clone()),
        )
    }
}
