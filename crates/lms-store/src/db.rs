//! SQLite persistence for accounts, role documents, and the catalog.
//!
//! One database file holds everything. The collaborator traits are
//! implemented in [`crate::accounts`] and [`crate::catalog`]; this module
//! owns the connection and schema.

use std::path::Path;

use lms_client::BackendError;
use parking_lot::{Mutex, MutexGuard};
use rusqlite::{Connection, ErrorCode, Result as SqliteResult, Row};

const SCHEMA: &str = r#"
-- Email/password accounts
CREATE TABLE IF NOT EXISTS accounts (
    uid TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password_hash TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

-- The credential left signed in (at most one row)
CREATE TABLE IF NOT EXISTS current_session (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    uid TEXT NOT NULL,
    signed_in_at INTEGER NOT NULL
);

-- Role documents, keyed by account. `role` is stored as written.
CREATE TABLE IF NOT EXISTS roles (
    uid TEXT PRIMARY KEY,
    role TEXT NOT NULL,
    email TEXT,
    created_at INTEGER
);
CREATE INDEX IF NOT EXISTS idx_roles_role ON roles(role);

-- Catalog
CREATE TABLE IF NOT EXISTS books (
    isbn TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    author TEXT NOT NULL,
    genre TEXT NOT NULL DEFAULT '',
    release_date TEXT NOT NULL DEFAULT '',
    language TEXT NOT NULL DEFAULT '',
    pages INTEGER NOT NULL DEFAULT 0,
    total_copies INTEGER NOT NULL DEFAULT 0,
    available_copies INTEGER NOT NULL DEFAULT 0,
    location TEXT NOT NULL DEFAULT '',
    summary TEXT NOT NULL DEFAULT '',
    cover_image_url TEXT,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS librarians (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    designation TEXT NOT NULL DEFAULT '',
    salary TEXT NOT NULL DEFAULT '',
    contact TEXT NOT NULL DEFAULT '',
    email TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    profile_image_url TEXT,
    approved INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL
);

-- Admin dashboard counters (at most one row)
CREATE TABLE IF NOT EXISTS admin_stats (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    librarians_count TEXT,
    revenue TEXT
);
"#;

/// Database handle shared by every SQLite-backed collaborator.
///
/// Wrap in an `Arc` and hand the same store to the session actor and the
/// catalog service. Statements are short, so a single mutex-guarded
/// connection is enough.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> SqliteResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> SqliteResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }

    /// Overwrite the revenue label shown on the admin dashboard.
    pub fn set_revenue(&self, label: &str) -> SqliteResult<()> {
        self.conn().execute(
            "INSERT INTO admin_stats (id, revenue) VALUES (1, ?1)
             ON CONFLICT(id) DO UPDATE SET revenue = excluded.revenue",
            [label],
        )?;
        Ok(())
    }
}

/// Map a SQLite failure onto the collaborator error.
pub(crate) fn storage(e: rusqlite::Error) -> BackendError {
    BackendError::Storage(e.to_string())
}

pub(crate) fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation
    )
}

/// Read a text column through a parser, e.g. a typed ID.
pub(crate) fn parsed_column<T, E>(
    row: &Row<'_>,
    idx: usize,
    parse: impl FnOnce(&str) -> Result<T, E>,
) -> SqliteResult<T>
where
    E: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    parse(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Millis are kept as INTEGER, which SQLite stores signed.
pub(crate) fn to_sql_millis(millis: u64) -> i64 {
    i64::try_from(millis).unwrap_or(i64::MAX)
}

pub(crate) fn from_sql_millis(millis: i64) -> u64 {
    u64::try_from(millis).unwrap_or(0)
}
