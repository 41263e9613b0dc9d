//! SQLite schema bootstrap.
//!
//! Layout:
//! - `key`: the node directory, `(id, parent, name, type)`, unique on
//!   `(parent, name)`; the root row is `(0, NULL, '/', 0)`.
//! - `number`, `string`, `raw`: value tables `(id, parent, value)`, at most one
//!   row per node, deleted with their node through `ON DELETE CASCADE`.
//!
//! The schema version is kept in `PRAGMA user_version`.

use rusqlite::Connection;
use tracing::info;

use crate::error::{StoreError, StoreResult};

/// Schema version written by this build.
pub const SCHEMA_VERSION: i64 = 1;

/// Name of the root row.
pub const ROOT_NAME: &str = "/";

const CREATE_TABLES: &str = "
CREATE TABLE IF NOT EXISTS key (
    id     INTEGER PRIMARY KEY AUTOINCREMENT,
    parent INTEGER REFERENCES key(id) ON DELETE CASCADE,
    name   TEXT NOT NULL,
    type   INTEGER NOT NULL,
    UNIQUE (parent, name)
);
CREATE TABLE IF NOT EXISTS number (
    id     INTEGER PRIMARY KEY AUTOINCREMENT,
    parent INTEGER NOT NULL UNIQUE REFERENCES key(id) ON DELETE CASCADE,
    value  INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS string (
    id     INTEGER PRIMARY KEY AUTOINCREMENT,
    parent INTEGER NOT NULL UNIQUE REFERENCES key(id) ON DELETE CASCADE,
    value  TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS raw (
    id     INTEGER PRIMARY KEY AUTOINCREMENT,
    parent INTEGER NOT NULL UNIQUE REFERENCES key(id) ON DELETE CASCADE,
    value  BLOB NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_key_parent ON key (parent);
INSERT OR IGNORE INTO key (id, parent, name, type) VALUES (0, NULL, '/', 0);
";

const DROP_TABLES: &str = "
DROP TABLE IF EXISTS number;
DROP TABLE IF EXISTS string;
DROP TABLE IF EXISTS raw;
DROP TABLE IF EXISTS key;
";

/// The schema version recorded in the database file.
pub fn stored_version(conn: &Connection) -> StoreResult<i64> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    Ok(version)
}

/// Create any missing tables and the root row, refusing newer schemas.
pub fn ensure(conn: &Connection) -> StoreResult<()> {
    let found = stored_version(conn)?;
    if found > SCHEMA_VERSION {
        return Err(StoreError::SchemaVersion {
            found,
            supported: SCHEMA_VERSION,
        });
    }
    conn.execute_batch(CREATE_TABLES)?;
    if found < SCHEMA_VERSION {
        conn.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
        info!(version = SCHEMA_VERSION, "registry schema created");
    }
    Ok(())
}

/// Drop every table and recreate an empty namespace.
pub fn reset(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(DROP_TABLES)?;
    conn.execute_batch(CREATE_TABLES)?;
    conn.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
    Ok(())
}
