//! heatline - Heat Scheduling & Assignment Engine
//!
//! A scheduling core for timed athletic competitions: partitions competitors
//! into fixed-capacity heats, computes wall-clock start times from interval
//! configuration, and supports safe incremental re-assignment (moves,
//! ranking reseeds, cross-category intercalation) without corrupting
//! published results or lane capacities.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`models`] - Core data structures and types
//! - [`store`] - Storage boundary (SQLite, in-memory)
//! - [`engine`] - Heat builder, schedule calculator, assignment engine
//! - [`error`] - Unified error handling
//!
//! # Example
//!
//! ```no_run
//! use heatline::engine::{BuildRequest, HeatBuilder};
//! use heatline::store::open_sqlite_store;
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = open_sqlite_store("data/heatline.db")?;
//!     let builder = HeatBuilder::new(store.clone(), store.clone(), store.clone());
//!     let championship_id = Uuid::new_v4();
//!     let report = builder
//!         .build_initial_heats(championship_id, BuildRequest::new(4))
//!         .await?;
//!     println!("created {} heats", report.heats_created);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod store;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::engine::{
        AssignmentEngine, BuildReport, BuildRequest, EngineError, EngineResult, HeatBuilder,
        HeatView, ReseedOutcome, ResultLockGuard, ScheduleCalculator, ScheduleProjection,
    };
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::models::{
        Category, Championship, Event, Heat, HeatEntry, IntervalSettings, Registration,
    };
    pub use crate::store::{
        create_memory_store, open_sqlite_store, HeatFilter, HeatStore, MemoryStore,
        ResultLock, RosterProvider, ScheduleStore, SqliteStore,
    };
}

// Direct re-exports for convenience
pub use models::{Category, Championship, Event, Heat, HeatEntry, IntervalSettings, Registration};
