//! `SQLite` schema definitions for whoopmania.

/// SQL statement to create the events table.
pub const CREATE_EVENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    event_type TEXT NOT NULL DEFAULT 'race',
    date TEXT NOT NULL,
    location TEXT,
    description TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create the pilots table.
pub const CREATE_PILOTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS pilots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    nickname TEXT NOT NULL,
    first_name TEXT,
    last_name TEXT,
    callsign TEXT,
    city TEXT,
    club TEXT,
    telegram_id INTEGER,
    created_at TEXT NOT NULL
)
";

/// Pilots are looked up by nickname on every import.
pub const CREATE_PILOT_NICKNAME_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_pilots_nickname ON pilots(nickname)
";

/// SQL statement to create the qualification results table.
pub const CREATE_QUALIFICATION_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS qualification_results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    event_id INTEGER NOT NULL REFERENCES events(id) ON DELETE CASCADE,
    pilot_id INTEGER NOT NULL REFERENCES pilots(id) ON DELETE CASCADE,
    rank INTEGER,
    best_lap_ms INTEGER,
    best3_avg_ms INTEGER,
    laps_total INTEGER,
    attempts_count INTEGER,
    consecutives_count INTEGER
)
";

/// SQL statement to index qualification results by event.
pub const CREATE_QUALIFICATION_EVENT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_qualification_event ON qualification_results(event_id)
";

/// SQL statement to index qualification results by pilot.
pub const CREATE_QUALIFICATION_PILOT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_qualification_pilot ON qualification_results(pilot_id)
";

/// SQL statement to create the bracket races table.
pub const CREATE_BRACKET_RACES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS bracket_races (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    event_id INTEGER NOT NULL REFERENCES events(id) ON DELETE CASCADE,
    number INTEGER NOT NULL,
    name TEXT NOT NULL,
    short_label TEXT NOT NULL,
    stage TEXT NOT NULL,
    bracket_side TEXT NOT NULL,
    UNIQUE (event_id, number)
)
";

/// SQL statement to create the bracket race results table.
pub const CREATE_BRACKET_RESULTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS bracket_race_results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    bracket_race_id INTEGER NOT NULL REFERENCES bracket_races(id) ON DELETE CASCADE,
    pilot_id INTEGER REFERENCES pilots(id) ON DELETE SET NULL,
    points_r1 INTEGER,
    points_r2 INTEGER,
    points_r3 INTEGER,
    points_r4 INTEGER,
    points_r5 INTEGER,
    total_points REAL,
    final_position INTEGER
)
";

/// SQL statement to index bracket results by race.
pub const CREATE_BRACKET_RESULTS_RACE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_bracket_results_race ON bracket_race_results(bracket_race_id)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_EVENTS_TABLE,
    CREATE_PILOTS_TABLE,
    CREATE_PILOT_NICKNAME_INDEX,
    CREATE_QUALIFICATION_TABLE,
    CREATE_QUALIFICATION_EVENT_INDEX,
    CREATE_QUALIFICATION_PILOT_INDEX,
    CREATE_BRACKET_RACES_TABLE,
    CREATE_BRACKET_RESULTS_TABLE,
    CREATE_BRACKET_RESULTS_RACE_INDEX,
    CREATE_METADATA_TABLE,
];
