//! Heat scheduling and assignment engine
//!
//! The hard core of the system: partitioning competitors into fixed-capacity
//! heats, computing wall-clock start times from interval configuration, and
//! safely re-assigning competitors without corrupting published results or
//! lane capacities.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    Assignment Engine                     │
//! │   move_entry / reseed_by_ranking / intercalate           │
//! └───────────────┬───────────────────────┬──────────────────┘
//!                 │                       │
//!          ┌──────▼──────┐        ┌───────▼────────┐
//!          │ Heat Builder │──────▶│    Schedule    │
//!          │              │       │   Calculator   │
//!          └──────┬──────┘        └───────┬────────┘
//!                 │                       │
//!        ┌────────▼───────────────────────▼────────┐
//!        │                Heat Store               │
//!        └─────────────────────────────────────────┘
//!                 gated by the Result Lock Guard
//! ```
//!
//! Every operation takes an explicit championship scope, reads the stored
//! state, computes, and persists; the engine holds no state between calls,
//! so any operation can be safely re-run after a partial failure.
//!
//! # Modules
//!
//! - [`builder`] - initial heat creation from rosters
//! - [`calculator`] - start-time computation and recalculation
//! - [`assignment`] - moves, reseeding, intercalation
//! - [`guard`] - the published-result reseed lock
//! - [`projection`] - read-only views for displays and exports
//! - [`error`] - the engine error taxonomy

pub mod assignment;
pub mod builder;
pub mod calculator;
pub mod error;
pub mod guard;
pub mod projection;

// Re-export main types
pub use assignment::{AssignmentEngine, IntercalationReport, ReseedOutcome};
pub use builder::{BuildReport, BuildRequest, HeatBuilder};
pub use calculator::ScheduleCalculator;
pub use error::{EngineError, EngineResult};
pub use guard::ResultLockGuard;
pub use projection::{HeatView, LaneView, ScheduleProjection};
