use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use heatline::config::Config;
use heatline::engine::{
    AssignmentEngine, BuildRequest, HeatBuilder, ResultLockGuard, ScheduleCalculator,
    ScheduleProjection,
};
use heatline::models::{Category, Championship, Event, IntervalSettings, Registration};
use heatline::store::{open_sqlite_store, SqliteStore};

#[derive(Parser)]
#[command(
    name = "heatline",
    version,
    about = "Heat scheduling and assignment engine for timed athletic competitions",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// SQLite database path (overrides config/env)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema
    Init {
        /// Seed a small demo championship and print its ids
        #[arg(long, default_value = "false")]
        sample: bool,
    },

    /// Build initial heats for a championship
    Build {
        /// Championship id
        championship: Uuid,

        /// Lane count per heat
        #[arg(short, long)]
        lanes: Option<u32>,

        /// First-heat start time (e.g. 2026-03-14T09:00:00)
        #[arg(short, long)]
        start: Option<NaiveDateTime>,

        /// Restrict to specific event ids
        #[arg(long)]
        event: Vec<Uuid>,

        /// Restrict to specific category ids
        #[arg(long)]
        category: Vec<Uuid>,
    },

    /// Append one heat and shift the heats after it
    AddHeat {
        /// Championship id
        championship: Uuid,

        /// Event id
        #[arg(long)]
        event: Uuid,

        /// Category id
        #[arg(long)]
        category: Uuid,

        /// Lane count
        #[arg(short, long)]
        lanes: Option<u32>,

        /// Scheduled start time
        #[arg(short, long)]
        time: NaiveDateTime,

        /// Display-name override
        #[arg(long)]
        name: Option<String>,
    },

    /// Recalculate every heat time of a championship
    Recalculate {
        /// Championship id
        championship: Uuid,

        /// Only shift heats after this heat id
        #[arg(long)]
        following: Option<Uuid>,
    },

    /// Move one entry to a heat and lane
    Move {
        /// Entry id
        entry: Uuid,

        /// Target heat id
        #[arg(long)]
        heat: Uuid,

        /// Target lane (1-based)
        #[arg(long, default_value = "1")]
        lane: u32,
    },

    /// Reseed heats from current standings (skips pairs with published results)
    Reseed {
        /// Event id
        event: Uuid,

        /// Limit to one category; all of the event's categories when omitted
        #[arg(long)]
        category: Option<Uuid>,
    },

    /// Redistribute an event's entries across its heats to fill empty lanes
    Intercalate {
        /// Event id
        event: Uuid,
    },

    /// Print the schedule projection
    Schedule {
        /// Championship id
        championship: Uuid,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(&cli.log_format, cli.verbose)?;

    let config = Config::from_env()?;
    config.validate()?;
    let db_path = cli
        .database
        .unwrap_or_else(|| config.database.sqlite_path.clone());
    let store = open_sqlite_store(&db_path)?;

    match cli.command {
        Commands::Init { sample } => init(&store, sample)?,

        Commands::Build {
            championship,
            lanes,
            start,
            event,
            category,
        } => {
            let mut request =
                BuildRequest::new(lanes.unwrap_or(config.scheduling.default_lane_count))
                    .with_events(event)
                    .with_categories(category);
            request.start_time = start;

            let builder = HeatBuilder::new(store.clone(), store.clone(), store.clone());
            let report = builder.build_initial_heats(championship, request).await?;
            println!(
                "Created {} heats with {} entries ({} categories skipped)",
                report.heats_created,
                report.entries_created,
                report.skipped_categories.len()
            );
        }

        Commands::AddHeat {
            championship,
            event,
            category,
            lanes,
            time,
            name,
        } => {
            let builder = HeatBuilder::new(store.clone(), store.clone(), store.clone());
            let heat = builder
                .add_single_heat(
                    championship,
                    event,
                    category,
                    lanes.unwrap_or(config.scheduling.default_lane_count),
                    time,
                    name,
                )
                .await?;
            println!("Added {} ({})", heat.display_name(), heat.id);
        }

        Commands::Recalculate {
            championship,
            following,
        } => {
            let calculator = ScheduleCalculator::new(store.clone(), store.clone());
            let changed = match following {
                Some(heat_id) => calculator.recalculate_following(heat_id).await?,
                None => calculator.recalculate_all(championship).await?,
            };
            println!("Updated {changed} heat times");
        }

        Commands::Move { entry, heat, lane } => {
            let engine = assignment_engine(&store);
            engine.move_entry(entry, heat, lane).await?;
            println!("Moved entry {entry} to heat {heat} lane {lane}");
        }

        Commands::Reseed { event, category } => {
            let engine = assignment_engine(&store);
            match category {
                Some(category_id) => {
                    let outcome = engine.reseed_by_ranking(event, category_id).await?;
                    println!("{category_id}: {outcome:?}");
                }
                None => {
                    for (category_id, outcome) in engine.reseed_event(event).await? {
                        println!("{category_id}: {outcome:?}");
                    }
                }
            }
        }

        Commands::Intercalate { event } => {
            let engine = assignment_engine(&store);
            let report = engine.intercalate(event).await?;
            println!(
                "Intercalated {} heats: {} entries, {} moved, {} mixed",
                report.heats, report.entries, report.moved, report.mixed_heats
            );
        }

        Commands::Schedule { championship } => {
            let projection =
                ScheduleProjection::new(store.clone(), store.clone(), store.clone());
            for view in projection.heat_views(championship).await? {
                let time = view
                    .scheduled_time
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| String::from("--:--"));
                println!(
                    "{time}  #{:<3} {:<20} {:<12} {:<12} [{}]",
                    view.heat_number,
                    view.name,
                    view.event_name,
                    view.category_name,
                    view.entries
                        .iter()
                        .map(|e| format!("{}:{}", e.lane_number, e.competitor))
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
        }
    }

    Ok(())
}

fn assignment_engine(store: &Arc<SqliteStore>) -> AssignmentEngine {
    AssignmentEngine::new(
        store.clone(),
        store.clone(),
        store.clone(),
        ResultLockGuard::new(store.clone()),
    )
}

fn init(store: &Arc<SqliteStore>, sample: bool) -> Result<()> {
    // Schema is created on open; init only needs to seed the sample.
    if !sample {
        println!("Database initialized");
        return Ok(());
    }

    let start = chrono::Local::now()
        .date_naive()
        .and_hms_opt(9, 0, 0)
        .expect("09:00 is a valid time");
    let championship = Championship::new("Demo Championship")
        .with_start_time(start)
        .with_intervals(IntervalSettings {
            transition_minutes: 2,
            category_interval_minutes: 5,
            event_interval_minutes: 10,
            day_breaks: Vec::new(),
        });
    store.insert_championship(&championship)?;

    let events = [
        Event::new(championship.id, "Event 1", 1, 1).with_time_cap("10:00"),
        Event::new(championship.id, "Event 2", 1, 2).with_time_cap("8:00"),
    ];
    for event in &events {
        store.insert_event(event)?;
    }

    let categories = [
        Category::new(championship.id, "RX", 1),
        Category::new(championship.id, "Scaled", 2),
    ];
    for category in &categories {
        store.insert_category(category)?;
        for i in 0..6i64 {
            store.insert_registration(
                &Registration::new(
                    championship.id,
                    category.id,
                    format!("{}-athlete-{i}", category.name.to_lowercase()),
                )
                .with_order_index(i + 1),
            )?;
        }
    }

    println!("Seeded demo championship {}", championship.id);
    for event in &events {
        println!("  event    {}  {}", event.id, event.name);
    }
    for category in &categories {
        println!("  category {}  {}", category.id, category.name);
    }
    Ok(())
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("heatline=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new("heatline=info,warn")
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
