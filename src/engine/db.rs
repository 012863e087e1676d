//! SQLite storage for the engagement engine
//!
//! One connection behind a mutex, shared by every manager through cheap
//! clones. The schema batch always describes the latest layout; numbered
//! migrations bring older database files forward.

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Latest schema version. Bump together with a migration block below.
const SCHEMA_VERSION: i64 = 3;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS heart_state (
    user_id TEXT PRIMARY KEY,
    current INTEGER NOT NULL,
    max_hearts INTEGER NOT NULL,
    last_refill_at INTEGER NOT NULL,
    refill_interval_minutes INTEGER NOT NULL,
    unlimited_until INTEGER,
    total_lost INTEGER NOT NULL DEFAULT 0,
    version INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS heart_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    delta INTEGER NOT NULL,
    reason TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_heart_events_user_time
    ON heart_events(user_id, timestamp);

CREATE TABLE IF NOT EXISTS streak_state (
    user_id TEXT PRIMARY KEY,
    current_streak INTEGER NOT NULL DEFAULT 0,
    longest_streak INTEGER NOT NULL DEFAULT 0,
    last_activity_date TEXT,
    freezes_available INTEGER NOT NULL DEFAULT 0,
    freeze_used_on TEXT,
    version INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS streak_days (
    user_id TEXT NOT NULL,
    date TEXT NOT NULL,
    maintained INTEGER NOT NULL,
    bonus_xp INTEGER NOT NULL DEFAULT 0,
    freeze_used INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (user_id, date)
);

CREATE TABLE IF NOT EXISTS activity_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    xp_earned INTEGER NOT NULL DEFAULT 0,
    timestamp INTEGER NOT NULL,
    metadata TEXT NOT NULL DEFAULT '{}'
);

CREATE INDEX IF NOT EXISTS idx_activity_user_time
    ON activity_log(user_id, timestamp DESC);

CREATE INDEX IF NOT EXISTS idx_activity_kind
    ON activity_log(kind, timestamp);

CREATE TABLE IF NOT EXISTS user_profile (
    user_id TEXT PRIMARY KEY,
    class_id TEXT,
    grade INTEGER NOT NULL DEFAULT 0,
    xp_total INTEGER NOT NULL DEFAULT 0,
    gems INTEGER NOT NULL DEFAULT 0,
    title TEXT,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS achievement_progress (
    user_id TEXT NOT NULL,
    achievement_id TEXT NOT NULL,
    current INTEGER NOT NULL DEFAULT 0,
    target INTEGER NOT NULL,
    unlocked INTEGER NOT NULL DEFAULT 0,
    unlocked_at INTEGER,
    rewards_claimed INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (user_id, achievement_id)
);

CREATE TABLE IF NOT EXISTS challenge_assignments (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    day TEXT NOT NULL,
    slot INTEGER NOT NULL,
    template_id TEXT NOT NULL,
    target INTEGER NOT NULL,
    progress INTEGER NOT NULL DEFAULT 0,
    completed INTEGER NOT NULL DEFAULT 0,
    completed_at INTEGER,
    rewards_claimed INTEGER NOT NULL DEFAULT 0,
    expires_at INTEGER NOT NULL,
    UNIQUE (user_id, day, slot)
);

CREATE TABLE IF NOT EXISTS leaderboard_snapshots (
    scope_type TEXT NOT NULL,
    scope_id TEXT NOT NULL DEFAULT '',
    metric TEXT NOT NULL,
    total_participants INTEGER NOT NULL DEFAULT 0,
    computed_at INTEGER NOT NULL,
    period_start TEXT,
    period_end TEXT,
    PRIMARY KEY (scope_type, scope_id, metric)
);

CREATE TABLE IF NOT EXISTS leaderboard_entries (
    scope_type TEXT NOT NULL,
    scope_id TEXT NOT NULL DEFAULT '',
    metric TEXT NOT NULL,
    user_id TEXT NOT NULL,
    rank INTEGER NOT NULL,
    score REAL NOT NULL,
    previous_rank INTEGER,
    rank_delta INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (scope_type, scope_id, metric, user_id)
);

CREATE INDEX IF NOT EXISTS idx_board_rank
    ON leaderboard_entries(scope_type, scope_id, metric, rank);

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL
);
"#;

/// Shared handle to the engine database. Cloning is cheap.
#[derive(Clone)]
pub struct GameDb {
    conn: Arc<Mutex<Connection>>,
}

impl GameDb {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating database directory {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("opening database at {}", path.display()))?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .context("enabling WAL mode")?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .context("setting synchronous mode")?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .context("enabling foreign keys")?;

        Self::init_schema(&conn)?;
        Self::run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open the database at the default location (`~/.motiva/motiva.db`).
    pub fn open_default() -> Result<Self> {
        let path = crate::config::global_dir().join("motiva.db");
        Self::open(&path)
    }

    /// In-memory database for tests and throwaway simulations.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("opening in-memory database")?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .context("enabling foreign keys")?;
        Self::init_schema(&conn)?;
        Self::run_migrations(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Lock the underlying connection. Recovers from a poisoned mutex since
    /// SQLite state stays consistent even if a holder panicked.
    pub fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(SCHEMA_SQL)
            .context("initializing database schema")?;
        Ok(())
    }

    fn run_migrations(conn: &Connection) -> Result<()> {
        let current: i64 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .context("reading schema version")?;

        if current == 0 {
            // Fresh database, the schema batch already created the latest
            // layout. Stamp it and skip the incremental steps.
            Self::stamp_version(conn, SCHEMA_VERSION)?;
            return Ok(());
        }

        if current < 2 {
            // Freeze bookkeeping moved from a nightly reset flag to a date
            // column compared against the current day.
            conn.execute_batch("ALTER TABLE streak_state ADD COLUMN freeze_used_on TEXT;")
                .context("migrating to schema v2")?;
            Self::stamp_version(conn, 2)?;
        }

        if current < 3 {
            conn.execute_batch(
                "ALTER TABLE heart_state ADD COLUMN version INTEGER NOT NULL DEFAULT 0;
                 ALTER TABLE streak_state ADD COLUMN version INTEGER NOT NULL DEFAULT 0;",
            )
            .context("migrating to schema v3")?;
            Self::stamp_version(conn, 3)?;
        }

        Ok(())
    }

    fn stamp_version(conn: &Connection, version: i64) -> Result<()> {
        conn.execute(
            "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, ?2)",
            rusqlite::params![version, chrono::Utc::now().timestamp_millis()],
        )
        .with_context(|| format!("recording schema version {version}"))?;
        Ok(())
    }
}
