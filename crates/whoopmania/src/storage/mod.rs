//! Storage layer for whoopmania.
//!
//! This module provides `SQLite`-based persistent storage for events,
//! pilots, qualification results and the bracket.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, types::Type, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use crate::bracket::{self, BracketSide, Stage};
use crate::error::{Error, Result};
use crate::model::{
    BracketRace, BracketRaceResult, Event, EventType, EventUpdate, NewEvent, NewRaceResult,
    Participation, Pilot, QualificationEntry, QualificationResult,
};

/// Date format of the `events.date` column.
const DATE_FORMAT: &str = "%Y-%m-%d";

const EVENT_COLUMNS: &str = "e.id, e.name, e.event_type, e.date, e.location, e.description";

const PILOT_COLUMNS: &str = "id, nickname, first_name, last_name, callsign, city, club, telegram_id, created_at";

const QUALIFICATION_COLUMNS: &str = "q.id, q.event_id, q.pilot_id, p.nickname, q.rank, \
     q.best_lap_ms, q.best3_avg_ms, q.laps_total, q.attempts_count, q.consecutives_count";

const RACE_COLUMNS: &str = "id, event_id, number, name, short_label, stage, bracket_side";

/// Storage engine for event data.
///
/// Holds a single `SQLite` connection. Write operations that touch several
/// rows run inside a transaction; callers can group several operations with
/// [`Storage::transaction`].
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` inside one transaction.
    ///
    /// Commits when `f` returns `Ok`, rolls back otherwise. When a
    /// transaction is already open, `f` joins it.
    ///
    /// # Errors
    ///
    /// Returns the error from `f`, or a database error from begin/commit.
    pub fn transaction<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        if !self.conn.is_autocommit() {
            return f(self);
        }

        let tx = self.conn.unchecked_transaction()?;
        let value = f(self)?;
        tx.commit()?;
        Ok(value)
    }

    // === Events ===

    /// Insert an event and return it.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn create_event(&self, event: &NewEvent) -> Result<Event> {
        self.conn.execute(
            r"
            INSERT INTO events (name, event_type, date, location, description)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
            params![
                event.name,
                event.event_type.to_string(),
                event.date.format(DATE_FORMAT).to_string(),
                event.location,
                event.description,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        info!("Created event {} ({})", id, event.name);
        Ok(Event {
            id,
            name: event.name.clone(),
            event_type: event.event_type,
            date: event.date,
            location: event.location.clone(),
            description: event.description.clone(),
        })
    }

    /// Get an event by its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_event(&self, id: i64) -> Result<Option<Event>> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events e WHERE e.id = ?1");
        let event = self
            .conn
            .query_row(&sql, [id], Self::row_to_event)
            .optional()?;
        Ok(event)
    }

    /// Get an event, failing with [`Error::EventNotFound`] if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the event is missing or the database operation fails.
    pub fn require_event(&self, id: i64) -> Result<Event> {
        self.get_event(id)?.ok_or(Error::EventNotFound { id })
    }

    /// List events, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_events(&self) -> Result<Vec<Event>> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events e ORDER BY e.date DESC, e.id DESC");
        let mut stmt = self.conn.prepare(&sql)?;
        let events = stmt
            .query_map([], Self::row_to_event)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(events)
    }

    /// Apply an update to an event and return the result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the update changes nothing,
    /// [`Error::EventNotFound`] if the event doesn't exist, or an error if the
    /// database operation fails.
    pub fn update_event(&self, id: i64, update: &EventUpdate) -> Result<Event> {
        if update.is_empty() {
            return Err(Error::invalid_input(
                "nothing to change; set a name, location or description",
            ));
        }

        let mut event = self.require_event(id)?;
        if let Some(name) = &update.name {
            event.name.clone_from(name);
        }
        if let Some(location) = &update.location {
            event.location = Some(location.clone());
        }
        if let Some(description) = &update.description {
            event.description = Some(description.clone());
        }

        self.conn.execute(
            "UPDATE events SET name = ?1, location = ?2, description = ?3 WHERE id = ?4",
            params![event.name, event.location, event.description, id],
        )?;
        debug!("Updated event {}", id);
        Ok(event)
    }

    /// Delete an event and everything recorded for it.
    ///
    /// Returns `true` if an event was deleted, `false` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_event(&self, id: i64) -> Result<bool> {
        let affected = self.conn.execute("DELETE FROM events WHERE id = ?1", [id])?;
        Ok(affected > 0)
    }

    // === Pilots ===

    /// Find a pilot by nickname, creating one if none exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_or_create_pilot(&self, nickname: &str) -> Result<Pilot> {
        let sql = format!("SELECT {PILOT_COLUMNS} FROM pilots WHERE nickname = ?1 ORDER BY id LIMIT 1");
        if let Some(pilot) = self
            .conn
            .query_row(&sql, [nickname], Self::row_to_pilot)
            .optional()?
        {
            return Ok(pilot);
        }

        let created_at = Utc::now();
        self.conn.execute(
            "INSERT INTO pilots (nickname, created_at) VALUES (?1, ?2)",
            params![nickname, created_at.to_rfc3339()],
        )?;
        let id = self.conn.last_insert_rowid();
        info!("Created pilot {} ({})", id, nickname);

        Ok(Pilot {
            id,
            nickname: nickname.to_string(),
            first_name: None,
            last_name: None,
            callsign: None,
            city: None,
            club: None,
            telegram_id: None,
            created_at,
        })
    }

    /// Get a pilot by its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_pilot(&self, id: i64) -> Result<Option<Pilot>> {
        let sql = format!("SELECT {PILOT_COLUMNS} FROM pilots WHERE id = ?1");
        let pilot = self
            .conn
            .query_row(&sql, [id], Self::row_to_pilot)
            .optional()?;
        Ok(pilot)
    }

    /// List pilots by nickname.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_pilots(&self) -> Result<Vec<Pilot>> {
        let sql = format!("SELECT {PILOT_COLUMNS} FROM pilots ORDER BY nickname ASC, id ASC");
        let mut stmt = self.conn.prepare(&sql)?;
        let pilots = stmt
            .query_map([], Self::row_to_pilot)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(pilots)
    }

    /// Every event a pilot qualified in, newest event first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn pilot_participations(&self, pilot_id: i64) -> Result<Vec<Participation>> {
        let sql = format!(
            r"
            SELECT {EVENT_COLUMNS}, {QUALIFICATION_COLUMNS}
            FROM qualification_results q
            JOIN events e ON e.id = q.event_id
            JOIN pilots p ON p.id = q.pilot_id
            WHERE q.pilot_id = ?1
            ORDER BY e.date DESC, q.rank IS NULL, q.rank ASC
            "
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let participations = stmt
            .query_map([pilot_id], |row| {
                Ok(Participation {
                    event: Self::row_to_event(row)?,
                    qualification: Self::row_to_qualification_at(row, 6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(participations)
    }

    // === Qualification ===

    /// Replace an event's qualification table.
    ///
    /// Pilots are resolved by nickname and created when unseen. Returns the
    /// number of rows written.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails; nothing is written
    /// in that case.
    pub fn replace_qualification(
        &self,
        event_id: i64,
        entries: &[QualificationEntry],
    ) -> Result<usize> {
        self.transaction(|storage| {
            let removed = storage.conn.execute(
                "DELETE FROM qualification_results WHERE event_id = ?1",
                [event_id],
            )?;
            if removed > 0 {
                debug!("Removed {} previous qualification rows for event {}", removed, event_id);
            }

            for entry in entries {
                let pilot = storage.get_or_create_pilot(&entry.nickname)?;
                storage.conn.execute(
                    r"
                    INSERT INTO qualification_results (
                        event_id, pilot_id, rank, best_lap_ms, best3_avg_ms,
                        laps_total, attempts_count, consecutives_count
                    )
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    ",
                    params![
                        event_id,
                        pilot.id,
                        entry.rank,
                        entry.best_lap_ms,
                        entry.best3_avg_ms,
                        entry.laps_total,
                        entry.attempts_count,
                        entry.consecutives_count,
                    ],
                )?;
            }
            Ok(entries.len())
        })
    }

    /// An event's qualification table by rank; unranked rows last.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn qualification(&self, event_id: i64) -> Result<Vec<QualificationResult>> {
        let sql = format!(
            r"
            SELECT {QUALIFICATION_COLUMNS}
            FROM qualification_results q
            JOIN pilots p ON p.id = q.pilot_id
            WHERE q.event_id = ?1
            ORDER BY q.rank IS NULL, q.rank ASC, q.id ASC
            "
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([event_id], |row| Self::row_to_qualification_at(row, 0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // === Bracket ===

    /// Create the 14 races of an event's bracket.
    ///
    /// Returns `false` without changes if the event already has races.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EventNotFound`] if the event doesn't exist, or an
    /// error if the database operation fails.
    pub fn create_bracket(&self, event_id: i64) -> Result<bool> {
        self.require_event(event_id)?;

        let existing: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM bracket_races WHERE event_id = ?1",
            [event_id],
            |row| row.get(0),
        )?;
        if existing > 0 {
            debug!("Event {} already has a bracket", event_id);
            return Ok(false);
        }

        self.transaction(|storage| {
            for slot in bracket::layout() {
                storage.conn.execute(
                    r"
                    INSERT INTO bracket_races (event_id, number, name, short_label, stage, bracket_side)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    ",
                    params![
                        event_id,
                        slot.number,
                        slot.name(),
                        slot.short_label,
                        slot.stage.as_str(),
                        slot.side().as_str(),
                    ],
                )?;
            }
            Ok(())
        })?;

        info!("Created bracket for event {}", event_id);
        Ok(true)
    }

    /// An event's bracket races by number.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn bracket_races(&self, event_id: i64) -> Result<Vec<BracketRace>> {
        let sql = format!("SELECT {RACE_COLUMNS} FROM bracket_races WHERE event_id = ?1 ORDER BY number");
        let mut stmt = self.conn.prepare(&sql)?;
        let races = stmt
            .query_map([event_id], Self::row_to_race)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(races)
    }

    /// Find an event's race by number.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn find_race(&self, event_id: i64, number: u32) -> Result<Option<BracketRace>> {
        let sql = format!("SELECT {RACE_COLUMNS} FROM bracket_races WHERE event_id = ?1 AND number = ?2");
        let race = self
            .conn
            .query_row(&sql, params![event_id, number], Self::row_to_race)
            .optional()?;
        Ok(race)
    }

    /// Replace the results of a race.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails; the previous results
    /// stay in place in that case.
    pub fn replace_race_results(&self, race_id: i64, results: &[NewRaceResult]) -> Result<usize> {
        self.transaction(|storage| {
            storage.conn.execute(
                "DELETE FROM bracket_race_results WHERE bracket_race_id = ?1",
                [race_id],
            )?;

            for result in results {
                let [r1, r2, r3, r4, r5] = result.round_points;
                storage.conn.execute(
                    r"
                    INSERT INTO bracket_race_results (
                        bracket_race_id, pilot_id, points_r1, points_r2, points_r3,
                        points_r4, points_r5, total_points, final_position
                    )
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    ",
                    params![
                        race_id,
                        result.pilot_id,
                        r1,
                        r2,
                        r3,
                        r4,
                        r5,
                        result.total_points,
                        result.final_position,
                    ],
                )?;
            }
            debug!("Wrote {} results for race {}", results.len(), race_id);
            Ok(results.len())
        })
    }

    /// A race's results by final position.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn race_results(&self, race_id: i64) -> Result<Vec<BracketRaceResult>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT r.id, r.bracket_race_id, r.pilot_id, p.nickname,
                   r.points_r1, r.points_r2, r.points_r3, r.points_r4, r.points_r5,
                   r.total_points, r.final_position
            FROM bracket_race_results r
            LEFT JOIN pilots p ON p.id = r.pilot_id
            WHERE r.bracket_race_id = ?1
            ORDER BY r.final_position IS NULL, r.final_position ASC, r.id ASC
            ",
        )?;
        let results = stmt
            .query_map([race_id], |row| {
                Ok(BracketRaceResult {
                    id: row.get(0)?,
                    bracket_race_id: row.get(1)?,
                    pilot_id: row.get(2)?,
                    nickname: row.get(3)?,
                    round_points: [row.get(4)?, row.get(5)?, row.get(6)?, row.get(7)?, row.get(8)?],
                    total_points: row.get(9)?,
                    final_position: row.get(10)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(results)
    }

    // === Statistics ===

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let count = |table: &str| -> Result<i64> {
            let n = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
            Ok(n)
        };

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map_or(0, |m| m.len())
        };

        Ok(StorageStats {
            events: count("events")?,
            pilots: count("pilots")?,
            qualification_results: count("qualification_results")?,
            bracket_races: count("bracket_races")?,
            race_results: count("bracket_race_results")?,
            db_size_bytes,
        })
    }

    // === Row mapping ===

    /// Map `EVENT_COLUMNS` starting at column 0.
    fn row_to_event(row: &rusqlite::Row) -> rusqlite::Result<Event> {
        let event_type_str: String = row.get(2)?;
        let date_str: String = row.get(3)?;

        let event_type = match event_type_str.as_str() {
            "race" => EventType::Race,
            "training" => EventType::Training,
            _ => {
                warn!("Unknown event type: {}, defaulting to race", event_type_str);
                EventType::Race
            }
        };

        let date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;

        Ok(Event {
            id: row.get(0)?,
            name: row.get(1)?,
            event_type,
            date,
            location: row.get(4)?,
            description: row.get(5)?,
        })
    }

    fn row_to_pilot(row: &rusqlite::Row) -> rusqlite::Result<Pilot> {
        let created_at_str: String = row.get(8)?;
        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc));

        Ok(Pilot {
            id: row.get(0)?,
            nickname: row.get(1)?,
            first_name: row.get(2)?,
            last_name: row.get(3)?,
            callsign: row.get(4)?,
            city: row.get(5)?,
            club: row.get(6)?,
            telegram_id: row.get(7)?,
            created_at,
        })
    }

    /// Map `QUALIFICATION_COLUMNS` starting at column `at`.
    fn row_to_qualification_at(
        row: &rusqlite::Row,
        at: usize,
    ) -> rusqlite::Result<QualificationResult> {
        Ok(QualificationResult {
            id: row.get(at)?,
            event_id: row.get(at + 1)?,
            pilot_id: row.get(at + 2)?,
            nickname: row.get(at + 3)?,
            rank: row.get(at + 4)?,
            best_lap_ms: row.get(at + 5)?,
            best3_avg_ms: row.get(at + 6)?,
            laps_total: row.get(at + 7)?,
            attempts_count: row.get(at + 8)?,
            consecutives_count: row.get(at + 9)?,
        })
    }

    fn row_to_race(row: &rusqlite::Row) -> rusqlite::Result<BracketRace> {
        let stage_str: String = row.get(5)?;
        let side_str: String = row.get(6)?;

        let stage = Stage::parse(&stage_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                5,
                Type::Text,
                format!("unknown bracket stage: {stage_str}").into(),
            )
        })?;
        let bracket_side = BracketSide::parse(&side_str).unwrap_or_else(|| {
            warn!("Unknown bracket side: {}, deriving from stage", side_str);
            stage.side()
        });

        Ok(BracketRace {
            id: row.get(0)?,
            event_id: row.get(1)?,
            number: row.get(2)?,
            name: row.get(3)?,
            short_label: row.get(4)?,
            stage,
            bracket_side,
        })
    }
}

/// Row counts and size of the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of events.
    pub events: i64,
    /// Number of pilots.
    pub pilots: i64,
    /// Number of qualification rows.
    pub qualification_results: i64,
    /// Number of bracket races.
    pub bracket_races: i64,
    /// Number of bracket race results.
    pub race_results: i64,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}
