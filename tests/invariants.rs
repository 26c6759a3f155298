//! Property tests for the assignment invariants
//!
//! Arbitrary sequences of moves against a small championship must never
//! break lane uniqueness, lane compaction, or single occupancy per event,
//! regardless of how many of the moves get rejected.

mod common;

use std::collections::HashSet;

use common::{at, Fixture};
use heatline::engine::{BuildRequest, EngineError};
use heatline::models::IntervalSettings;
use heatline::store::{HeatFilter, HeatStore};
use proptest::prelude::*;

fn intervals() -> IntervalSettings {
    IntervalSettings {
        transition_minutes: 2,
        category_interval_minutes: 5,
        event_interval_minutes: 10,
        day_breaks: Vec::new(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_moves_preserve_lane_and_occupancy_invariants(
        ops in prop::collection::vec((0usize..64, 0usize..8, 1u32..8), 0..40)
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime");

        rt.block_on(async {
            let fixture = Fixture::new(intervals());
            fixture.event("Event 1", 1, 1, "10:00");
            let rx = fixture.category("RX", 1);
            let scaled = fixture.category("Scaled", 2);
            fixture.roster(&rx, 7);
            fixture.roster(&scaled, 3);

            fixture
                .builder()
                .build_initial_heats(
                    fixture.championship.id,
                    BuildRequest::new(4).with_start_time(at("09:00")),
                )
                .await
                .unwrap();

            let heats = fixture
                .store
                .list_heats(fixture.championship.id, HeatFilter::all())
                .await
                .unwrap();
            let heat_ids: Vec<_> = heats.iter().map(|h| h.id).collect();
            let engine = fixture.assignment();

            for (entry_pick, heat_pick, lane) in &ops {
                let entries = fixture.store.list_entries(&heat_ids).await.unwrap();
                if entries.is_empty() {
                    break;
                }
                let entry = &entries[entry_pick % entries.len()];
                let target = &heats[heat_pick % heats.len()];

                match engine.move_entry(entry.id, target.id, *lane).await {
                    Ok(()) => {}
                    // Capacity and duplicate rejections are legal outcomes.
                    Err(EngineError::HeatFull { .. }) => {}
                    Err(EngineError::DuplicateEntry { .. }) => {}
                    Err(other) => panic!("unexpected engine error: {other}"),
                }
            }

            let entries = fixture.store.list_entries(&heat_ids).await.unwrap();

            // Single occupancy: a registration appears at most once per event.
            let mut seen = HashSet::new();
            for entry in &entries {
                prop_assert!(
                    seen.insert(entry.registration_id),
                    "registration {} placed twice",
                    entry.registration_id
                );
            }

            // Lane uniqueness and compaction: every heat holds lanes 1..=N
            // and never exceeds its capacity.
            for heat in &heats {
                let lanes: Vec<u32> = entries
                    .iter()
                    .filter(|e| e.heat_id == heat.id)
                    .map(|e| e.lane_number)
                    .collect();
                prop_assert!(lanes.len() <= heat.capacity as usize);
                let expected: Vec<u32> = (1..=lanes.len() as u32).collect();
                prop_assert_eq!(lanes, expected);
            }

            // Nobody vanished: all ten competitors are still placed.
            prop_assert_eq!(entries.len(), 10);
            Ok(())
        })?;
    }
}
