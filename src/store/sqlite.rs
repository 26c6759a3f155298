//! SQLite store
//!
//! Production backend for all four storage traits. Uses a `Mutex<Connection>`
//! for thread safety, WAL journaling, and `ON DELETE CASCADE` so removing a
//! heat removes its entries at the store boundary.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::models::{
    Category, Championship, Event, Heat, HeatEntry, IntervalSettings, PublishedResult,
    Registration,
};

use super::{HeatFilter, HeatStore, ResultLock, RosterProvider, ScheduleStore, StoreResult};

const NAIVE_FMT: &str = "%Y-%m-%dT%H:%M:%S";

fn conversion_err(idx: usize, err: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

fn read_uuid(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let value: String = row.get(idx)?;
    Uuid::parse_str(&value).map_err(|e| conversion_err(idx, e))
}

fn read_opt_naive(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDateTime>> {
    let value: Option<String> = row.get(idx)?;
    value
        .map(|v| NaiveDateTime::parse_from_str(&v, NAIVE_FMT).map_err(|e| conversion_err(idx, e)))
        .transpose()
}

fn read_utc(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let value: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_err(idx, e))
}

fn fmt_naive(time: NaiveDateTime) -> String {
    time.format(NAIVE_FMT).to_string()
}

/// SQLite implementation of the storage traits
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
        )?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_schema()?;

        tracing::info!(path = %path.display(), "SQLite store initialized");
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_schema()?;
        Ok(store)
    }

    fn create_schema(&self) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS championships (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                start_time TEXT,
                transition_minutes INTEGER NOT NULL DEFAULT 2,
                category_interval_minutes INTEGER NOT NULL DEFAULT 0,
                event_interval_minutes INTEGER NOT NULL DEFAULT 0,
                day_breaks TEXT NOT NULL DEFAULT '[]'
            );

            CREATE TABLE IF NOT EXISTS events (
                id TEXT PRIMARY KEY,
                championship_id TEXT NOT NULL REFERENCES championships(id),
                name TEXT NOT NULL,
                day INTEGER NOT NULL,
                position INTEGER NOT NULL,
                time_cap TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_events_championship
                ON events(championship_id, day, position);

            CREATE TABLE IF NOT EXISTS categories (
                id TEXT PRIMARY KEY,
                championship_id TEXT NOT NULL REFERENCES championships(id),
                name TEXT NOT NULL,
                position INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_categories_championship
                ON categories(championship_id, position);

            CREATE TABLE IF NOT EXISTS registrations (
                id TEXT PRIMARY KEY,
                championship_id TEXT NOT NULL REFERENCES championships(id),
                category_id TEXT NOT NULL REFERENCES categories(id),
                competitor TEXT NOT NULL,
                order_index INTEGER,
                approved INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_registrations_category
                ON registrations(category_id, approved);

            CREATE TABLE IF NOT EXISTS heats (
                id TEXT PRIMARY KEY,
                championship_id TEXT NOT NULL REFERENCES championships(id),
                event_id TEXT NOT NULL REFERENCES events(id),
                category_id TEXT NOT NULL REFERENCES categories(id),
                heat_number INTEGER NOT NULL,
                capacity INTEGER NOT NULL,
                scheduled_time TEXT,
                manual_time INTEGER NOT NULL DEFAULT 0,
                custom_name TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_heats_championship
                ON heats(championship_id, heat_number);

            CREATE TABLE IF NOT EXISTS heat_entries (
                id TEXT PRIMARY KEY,
                heat_id TEXT NOT NULL REFERENCES heats(id) ON DELETE CASCADE,
                registration_id TEXT NOT NULL,
                lane_number INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_heat_entries_heat
                ON heat_entries(heat_id, lane_number);

            CREATE TABLE IF NOT EXISTS results (
                id TEXT PRIMARY KEY,
                event_id TEXT NOT NULL,
                category_id TEXT NOT NULL,
                registration_id TEXT,
                is_published INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_results_pair
                ON results(event_id, category_id, is_published);
            "#,
        )?;
        Ok(())
    }

    pub fn insert_championship(&self, championship: &Championship) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        let day_breaks = serde_json::to_string(&championship.intervals.day_breaks)?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO championships
                (id, name, start_time, transition_minutes, category_interval_minutes,
                 event_interval_minutes, day_breaks)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                championship.id.to_string(),
                championship.name,
                championship.start_time.map(fmt_naive),
                championship.intervals.transition_minutes,
                championship.intervals.category_interval_minutes,
                championship.intervals.event_interval_minutes,
                day_breaks,
            ],
        )?;
        Ok(())
    }

    pub fn insert_event(&self, event: &Event) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO events (id, championship_id, name, day, position, time_cap)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                event.id.to_string(),
                event.championship_id.to_string(),
                event.name,
                event.day,
                event.position,
                event.time_cap,
            ],
        )?;
        Ok(())
    }

    pub fn insert_category(&self, category: &Category) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO categories (id, championship_id, name, position)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                category.id.to_string(),
                category.championship_id.to_string(),
                category.name,
                category.position,
            ],
        )?;
        Ok(())
    }

    pub fn insert_registration(&self, registration: &Registration) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT OR REPLACE INTO registrations
                (id, championship_id, category_id, competitor, order_index, approved, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                registration.id.to_string(),
                registration.championship_id.to_string(),
                registration.category_id.to_string(),
                registration.competitor,
                registration.order_index,
                registration.approved as i64,
                registration.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Record a result row; published rows lock their (event, category) pair.
    pub fn insert_result(&self, result: &PublishedResult) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO results (id, event_id, category_id, registration_id, is_published)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                result.id.to_string(),
                result.event_id.to_string(),
                result.category_id.to_string(),
                result.registration_id.map(|id| id.to_string()),
                result.is_published as i64,
            ],
        )?;
        Ok(())
    }

    fn heat_from_row(row: &Row<'_>) -> rusqlite::Result<Heat> {
        Ok(Heat {
            id: read_uuid(row, 0)?,
            championship_id: read_uuid(row, 1)?,
            event_id: read_uuid(row, 2)?,
            category_id: read_uuid(row, 3)?,
            heat_number: row.get(4)?,
            capacity: row.get(5)?,
            scheduled_time: read_opt_naive(row, 6)?,
            manual_time: row.get::<_, i64>(7)? != 0,
            custom_name: row.get(8)?,
        })
    }

    fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<HeatEntry> {
        Ok(HeatEntry {
            id: read_uuid(row, 0)?,
            heat_id: read_uuid(row, 1)?,
            registration_id: read_uuid(row, 2)?,
            lane_number: row.get(3)?,
        })
    }

    fn registration_from_row(row: &Row<'_>) -> rusqlite::Result<Registration> {
        Ok(Registration {
            id: read_uuid(row, 0)?,
            championship_id: read_uuid(row, 1)?,
            category_id: read_uuid(row, 2)?,
            competitor: row.get(3)?,
            order_index: row.get(4)?,
            approved: row.get::<_, i64>(5)? != 0,
            created_at: read_utc(row, 6)?,
        })
    }

    fn event_from_row(row: &Row<'_>) -> rusqlite::Result<Event> {
        Ok(Event {
            id: read_uuid(row, 0)?,
            championship_id: read_uuid(row, 1)?,
            name: row.get(2)?,
            day: row.get(3)?,
            position: row.get(4)?,
            time_cap: row.get(5)?,
        })
    }

    fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
        Ok(Category {
            id: read_uuid(row, 0)?,
            championship_id: read_uuid(row, 1)?,
            name: row.get(2)?,
            position: row.get(3)?,
        })
    }

    fn write_heat(conn: &Connection, heat: &Heat) -> rusqlite::Result<()> {
        conn.execute(
            r#"
            INSERT OR REPLACE INTO heats
                (id, championship_id, event_id, category_id, heat_number, capacity,
                 scheduled_time, manual_time, custom_name)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                heat.id.to_string(),
                heat.championship_id.to_string(),
                heat.event_id.to_string(),
                heat.category_id.to_string(),
                heat.heat_number,
                heat.capacity,
                heat.scheduled_time.map(fmt_naive),
                heat.manual_time as i64,
                heat.custom_name,
            ],
        )?;
        Ok(())
    }
}

#[async_trait]
impl ScheduleStore for SqliteStore {
    async fn get_championship(&self, id: Uuid) -> StoreResult<Option<Championship>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT id, name, start_time, transition_minutes, category_interval_minutes,
                        event_interval_minutes, day_breaks
                 FROM championships WHERE id = ?1",
                params![id.to_string()],
                |row| {
                    Ok((
                        read_uuid(row, 0)?,
                        row.get::<_, String>(1)?,
                        read_opt_naive(row, 2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, i64>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                },
            )
            .optional()?;

        row.map(
            |(id, name, start_time, transition, category, event, day_breaks)| {
                Ok(Championship {
                    id,
                    name,
                    start_time,
                    intervals: IntervalSettings {
                        transition_minutes: transition,
                        category_interval_minutes: category,
                        event_interval_minutes: event,
                        day_breaks: serde_json::from_str(&day_breaks)?,
                    },
                })
            },
        )
        .transpose()
    }

    async fn list_events(&self, championship_id: Uuid) -> StoreResult<Vec<Event>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, championship_id, name, day, position, time_cap
             FROM events WHERE championship_id = ?1
             ORDER BY day, position",
        )?;
        let events = stmt
            .query_map(params![championship_id.to_string()], Self::event_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(events)
    }

    async fn list_categories(&self, championship_id: Uuid) -> StoreResult<Vec<Category>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, championship_id, name, position
             FROM categories WHERE championship_id = ?1
             ORDER BY position",
        )?;
        let categories = stmt
            .query_map(params![championship_id.to_string()], Self::category_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(categories)
    }

    async fn get_event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        let conn = self.conn.lock().unwrap();
        let event = conn
            .query_row(
                "SELECT id, championship_id, name, day, position, time_cap
                 FROM events WHERE id = ?1",
                params![id.to_string()],
                Self::event_from_row,
            )
            .optional()?;
        Ok(event)
    }

    async fn get_category(&self, id: Uuid) -> StoreResult<Option<Category>> {
        let conn = self.conn.lock().unwrap();
        let category = conn
            .query_row(
                "SELECT id, championship_id, name, position FROM categories WHERE id = ?1",
                params![id.to_string()],
                Self::category_from_row,
            )
            .optional()?;
        Ok(category)
    }

    async fn intervals(&self, championship_id: Uuid) -> StoreResult<IntervalSettings> {
        Ok(self
            .get_championship(championship_id)
            .await?
            .map(|c| c.intervals)
            .unwrap_or_default())
    }
}

#[async_trait]
impl HeatStore for SqliteStore {
    async fn insert_heats(&self, heats: &[Heat]) -> StoreResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        for heat in heats {
            Self::write_heat(&tx, heat)?;
        }
        tx.commit()?;
        Ok(())
    }

    async fn get_heat(&self, id: Uuid) -> StoreResult<Option<Heat>> {
        let conn = self.conn.lock().unwrap();
        let heat = conn
            .query_row(
                "SELECT id, championship_id, event_id, category_id, heat_number, capacity,
                        scheduled_time, manual_time, custom_name
                 FROM heats WHERE id = ?1",
                params![id.to_string()],
                Self::heat_from_row,
            )
            .optional()?;
        Ok(heat)
    }

    async fn list_heats(
        &self,
        championship_id: Uuid,
        filter: HeatFilter,
    ) -> StoreResult<Vec<Heat>> {
        let conn = self.conn.lock().unwrap();
        let mut sql = String::from(
            "SELECT id, championship_id, event_id, category_id, heat_number, capacity,
                    scheduled_time, manual_time, custom_name
             FROM heats WHERE championship_id = ?1",
        );
        let mut params_vec: Vec<String> = vec![championship_id.to_string()];
        if let Some(event_id) = filter.event_id {
            params_vec.push(event_id.to_string());
            sql.push_str(&format!(" AND event_id = ?{}", params_vec.len()));
        }
        if let Some(category_id) = filter.category_id {
            params_vec.push(category_id.to_string());
            sql.push_str(&format!(" AND category_id = ?{}", params_vec.len()));
        }
        sql.push_str(" ORDER BY heat_number");

        let mut stmt = conn.prepare(&sql)?;
        let bind: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p as &dyn rusqlite::ToSql).collect();
        let heats = stmt
            .query_map(bind.as_slice(), Self::heat_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(heats)
    }

    async fn update_heats(&self, heats: &[Heat]) -> StoreResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        for heat in heats {
            Self::write_heat(&tx, heat)?;
        }
        tx.commit()?;
        Ok(())
    }

    async fn delete_heat(&self, id: Uuid) -> StoreResult<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM heats WHERE id = ?1", params![id.to_string()])?;
        Ok(deleted > 0)
    }

    async fn max_heat_number(&self, championship_id: Uuid) -> StoreResult<i64> {
        let conn = self.conn.lock().unwrap();
        let max: i64 = conn.query_row(
            "SELECT COALESCE(MAX(heat_number), 0) FROM heats WHERE championship_id = ?1",
            params![championship_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(max)
    }

    async fn get_entry(&self, id: Uuid) -> StoreResult<Option<HeatEntry>> {
        let conn = self.conn.lock().unwrap();
        let entry = conn
            .query_row(
                "SELECT id, heat_id, registration_id, lane_number
                 FROM heat_entries WHERE id = ?1",
                params![id.to_string()],
                Self::entry_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    async fn list_entries(&self, heat_ids: &[Uuid]) -> StoreResult<Vec<HeatEntry>> {
        if heat_ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.conn.lock().unwrap();
        const CHUNK_SIZE: usize = 500;
        let mut entries = Vec::new();

        for chunk in heat_ids.chunks(CHUNK_SIZE) {
            let placeholders: String =
                chunk.iter().map(|_| "?").collect::<Vec<_>>().join(",");
            let sql = format!(
                "SELECT id, heat_id, registration_id, lane_number
                 FROM heat_entries WHERE heat_id IN ({placeholders})"
            );
            let ids: Vec<String> = chunk.iter().map(|id| id.to_string()).collect();
            let bind: Vec<&dyn rusqlite::ToSql> =
                ids.iter().map(|id| id as &dyn rusqlite::ToSql).collect();

            let mut stmt = conn.prepare(&sql)?;
            let chunk_entries = stmt
                .query_map(bind.as_slice(), Self::entry_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            entries.extend(chunk_entries);
        }

        // Preserve the caller's heat order, lanes ascending within a heat.
        let order: HashMap<Uuid, usize> =
            heat_ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        entries.sort_by_key(|e| (order.get(&e.heat_id).copied().unwrap_or(usize::MAX), e.lane_number));
        Ok(entries)
    }

    async fn replace_entries(&self, heat_id: Uuid, entries: &[HeatEntry]) -> StoreResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM heat_entries WHERE heat_id = ?1",
            params![heat_id.to_string()],
        )?;
        for entry in entries {
            tx.execute(
                "INSERT INTO heat_entries (id, heat_id, registration_id, lane_number)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    entry.id.to_string(),
                    entry.heat_id.to_string(),
                    entry.registration_id.to_string(),
                    entry.lane_number,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

#[async_trait]
impl RosterProvider for SqliteStore {
    async fn approved_roster(&self, category_id: Uuid) -> StoreResult<Vec<Registration>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, championship_id, category_id, competitor, order_index, approved, created_at
             FROM registrations
             WHERE category_id = ?1 AND approved = 1
             ORDER BY order_index IS NULL, order_index, created_at",
        )?;
        let roster = stmt
            .query_map(params![category_id.to_string()], Self::registration_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(roster)
    }

    async fn registrations(&self, ids: &[Uuid]) -> StoreResult<Vec<Registration>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.conn.lock().unwrap();
        const CHUNK_SIZE: usize = 500;
        let mut found = Vec::new();

        for chunk in ids.chunks(CHUNK_SIZE) {
            let placeholders: String =
                chunk.iter().map(|_| "?").collect::<Vec<_>>().join(",");
            let sql = format!(
                "SELECT id, championship_id, category_id, competitor, order_index, approved, created_at
                 FROM registrations WHERE id IN ({placeholders})"
            );
            let id_strs: Vec<String> = chunk.iter().map(|id| id.to_string()).collect();
            let bind: Vec<&dyn rusqlite::ToSql> =
                id_strs.iter().map(|id| id as &dyn rusqlite::ToSql).collect();

            let mut stmt = conn.prepare(&sql)?;
            let chunk_regs = stmt
                .query_map(bind.as_slice(), Self::registration_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            found.extend(chunk_regs);
        }

        Ok(found)
    }
}

#[async_trait]
impl ResultLock for SqliteStore {
    async fn has_published_results(
        &self,
        event_id: Uuid,
        category_id: Uuid,
    ) -> StoreResult<bool> {
        let conn = self.conn.lock().unwrap();
        let exists: bool = conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM results
                WHERE event_id = ?1 AND category_id = ?2 AND is_published = 1
             )",
            params![event_id.to_string(), category_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }
}
