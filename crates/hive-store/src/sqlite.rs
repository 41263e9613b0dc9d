use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::types::Value;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use hive_types::{KeyType, KeyValue, NodeId, NodeRecord};

use crate::error::{StoreError, StoreResult};
use crate::schema;
use crate::traits::{void_has_no_table, NodeStore};
use crate::translate::StorageErrorKind;

/// SQLite journal mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalMode {
    /// Rollback journal kept in memory (the registry's historical setting).
    #[default]
    Memory,
    /// Write-ahead log.
    Wal,
    /// Rollback journal file deleted after each transaction.
    Delete,
}

impl JournalMode {
    /// The `journal_mode` pragma value.
    pub const fn pragma_value(self) -> &'static str {
        match self {
            JournalMode::Memory => "memory",
            JournalMode::Wal => "wal",
            JournalMode::Delete => "delete",
        }
    }
}

/// Connection settings for [`SqliteNodeStore`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteOptions {
    pub journal_mode: JournalMode,
    /// Enforce foreign keys. When on, deleting a node cascades to its subtree.
    pub foreign_keys: bool,
    pub busy_timeout_ms: u64,
}

impl Default for SqliteOptions {
    fn default() -> Self {
        Self {
            journal_mode: JournalMode::default(),
            foreign_keys: true,
            busy_timeout_ms: 5_000,
        }
    }
}

/// Statements for one value table.
struct ValueSql {
    select: &'static str,
    insert: &'static str,
    update: &'static str,
    delete: &'static str,
    exists: &'static str,
}

macro_rules! value_sql {
    ($table:literal) => {
        ValueSql {
            select: concat!("SELECT value FROM ", $table, " WHERE parent = ?1"),
            insert: concat!("INSERT INTO ", $table, " (parent, value) VALUES (?1, ?2)"),
            update: concat!("UPDATE ", $table, " SET value = ?2 WHERE parent = ?1"),
            delete: concat!("DELETE FROM ", $table, " WHERE parent = ?1"),
            exists: concat!("SELECT 1 FROM ", $table, " WHERE parent = ?1"),
        }
    };
}

const NUMBER_SQL: ValueSql = value_sql!("number");
const STRING_SQL: ValueSql = value_sql!("string");
const RAW_SQL: ValueSql = value_sql!("raw");

const SAVEPOINT: &str = "SAVEPOINT hive_mutation";
const RELEASE: &str = "RELEASE hive_mutation";
const ROLLBACK: &str = "ROLLBACK TO hive_mutation; RELEASE hive_mutation";

fn value_sql(kind: KeyType) -> StoreResult<&'static ValueSql> {
    match kind {
        KeyType::Number => Ok(&NUMBER_SQL),
        KeyType::String => Ok(&STRING_SQL),
        KeyType::Raw => Ok(&RAW_SQL),
        KeyType::Void => Err(void_has_no_table()),
    }
}

/// Bind form of a payload. Numbers are stored as the bit-identical `i64`.
fn bind(value: &KeyValue) -> StoreResult<Value> {
    match value {
        KeyValue::Number(n) => Ok(Value::Integer(*n as i64)),
        KeyValue::String(s) => Ok(Value::Text(s.clone())),
        KeyValue::Raw(bytes) => Ok(Value::Blob(bytes.clone())),
        KeyValue::Void => Err(void_has_no_table()),
    }
}

fn node_from_row(row: &Row<'_>) -> rusqlite::Result<NodeRecord> {
    Ok(NodeRecord {
        id: NodeId::new(row.get(0)?),
        parent: row.get::<_, Option<i64>>(1)?.map(NodeId::new),
        name: row.get(2)?,
        tag: row.get(3)?,
    })
}

/// Durable [`NodeStore`] on an SQLite database.
///
/// Statements are parameterized and cached per connection. Multi-step
/// mutations run inside a savepoint, so they nest inside any transaction the
/// caller already holds.
pub struct SqliteNodeStore {
    conn: Connection,
    path: Option<PathBuf>,
    options: SqliteOptions,
}

impl SqliteNodeStore {
    /// Open (or create) a registry database at `path`.
    ///
    /// A new file is bootstrapped with an empty namespace. An existing file
    /// keeps its keys; missing tables are created.
    pub fn open(path: &Path, options: SqliteOptions) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE;
        let conn = Connection::open_with_flags(path, flags)?;
        let store = Self::configure(conn, Some(path.to_path_buf()), options)?;
        debug!(path = %path.display(), "registry database opened");
        Ok(store)
    }

    /// Open a private in-memory database. Its contents vanish on drop.
    pub fn open_in_memory(options: SqliteOptions) -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure(conn, None, options)
    }

    fn configure(conn: Connection, path: Option<PathBuf>, options: SqliteOptions) -> StoreResult<Self> {
        conn.execute_batch(&format!(
            "PRAGMA journal_mode = {};",
            options.journal_mode.pragma_value()
        ))?;
        conn.execute_batch(if options.foreign_keys {
            "PRAGMA foreign_keys = ON;"
        } else {
            "PRAGMA foreign_keys = OFF;"
        })?;
        conn.busy_timeout(Duration::from_millis(options.busy_timeout_ms))?;
        schema::ensure(&conn)?;
        Ok(Self {
            conn,
            path,
            options,
        })
    }

    /// The database file, or `None` for an in-memory store.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl std::fmt::Debug for SqliteNodeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteNodeStore")
            .field("path", &self.path)
            .field("options", &self.options)
            .finish()
    }
}

impl NodeStore for SqliteNodeStore {
    fn reset(&mut self) -> StoreResult<()> {
        schema::reset(&self.conn)
    }

    fn node(&self, id: NodeId) -> StoreResult<Option<NodeRecord>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT id, parent, name, type FROM key WHERE id = ?1")?;
        let record = stmt.query_row(params![id.get()], node_from_row).optional()?;
        Ok(record)
    }

    fn child(&self, parent: NodeId, name: &str) -> StoreResult<Option<NodeId>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT id FROM key WHERE parent = ?1 AND name = ?2")?;
        let id = stmt
            .query_row(params![parent.get(), name], |row| row.get::<_, i64>(0))
            .optional()?;
        Ok(id.map(NodeId::new))
    }

    fn children(&self, parent: NodeId) -> StoreResult<Vec<NodeRecord>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, parent, name, type FROM key WHERE parent = ?1 ORDER BY name",
        )?;
        let rows = stmt.query_map(params![parent.get()], node_from_row)?;
        let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn nodes(&self) -> StoreResult<Vec<NodeRecord>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT id, parent, name, type FROM key ORDER BY id")?;
        let rows = stmt.query_map([], node_from_row)?;
        let records = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn insert_node(&mut self, parent: NodeId, name: &str) -> StoreResult<NodeId> {
        let mut stmt = self
            .conn
            .prepare_cached("INSERT INTO key (parent, name, type) VALUES (?1, ?2, ?3)")?;
        stmt.execute(params![parent.get(), name, KeyType::Void.tag()])?;
        Ok(NodeId::new(self.conn.last_insert_rowid()))
    }

    fn delete_node(&mut self, id: NodeId) -> StoreResult<bool> {
        if id.is_root() {
            return Err(StoreError::storage(
                StorageErrorKind::Misuse,
                "the root node cannot be deleted",
            ));
        }
        let mut stmt = self.conn.prepare_cached("DELETE FROM key WHERE id = ?1")?;
        let changed = stmt.execute(params![id.get()])?;
        Ok(changed > 0)
    }

    fn set_tag(&mut self, id: NodeId, kind: KeyType) -> StoreResult<()> {
        let mut stmt = self
            .conn
            .prepare_cached("UPDATE key SET type = ?1 WHERE id = ?2")?;
        stmt.execute(params![kind.tag(), id.get()])?;
        Ok(())
    }

    fn read_value(&self, id: NodeId, kind: KeyType) -> StoreResult<Option<KeyValue>> {
        let sql = value_sql(kind)?;
        let mut stmt = self.conn.prepare_cached(sql.select)?;
        let value = stmt
            .query_row(params![id.get()], |row| match kind {
                KeyType::Number => Ok(KeyValue::Number(row.get::<_, i64>(0)? as u64)),
                KeyType::String => Ok(KeyValue::String(row.get(0)?)),
                KeyType::Raw => Ok(KeyValue::Raw(
                    row.get::<_, Option<Vec<u8>>>(0)?.unwrap_or_default(),
                )),
                KeyType::Void => Ok(KeyValue::Void),
            })
            .optional()?;
        Ok(value)
    }

    fn insert_value(&mut self, id: NodeId, value: &KeyValue) -> StoreResult<()> {
        let sql = value_sql(value.key_type())?;
        let mut stmt = self.conn.prepare_cached(sql.insert)?;
        stmt.execute(params![id.get(), bind(value)?])?;
        Ok(())
    }

    fn update_value(&mut self, id: NodeId, value: &KeyValue) -> StoreResult<bool> {
        let sql = value_sql(value.key_type())?;
        let mut stmt = self.conn.prepare_cached(sql.update)?;
        let changed = stmt.execute(params![id.get(), bind(value)?])?;
        Ok(changed > 0)
    }

    fn delete_value(&mut self, id: NodeId, kind: KeyType) -> StoreResult<bool> {
        let sql = value_sql(kind)?;
        let mut stmt = self.conn.prepare_cached(sql.delete)?;
        let changed = stmt.execute(params![id.get()])?;
        Ok(changed > 0)
    }

    fn value_tables(&self, id: NodeId) -> StoreResult<Vec<KeyType>> {
        let mut tables = Vec::new();
        for kind in KeyType::STORED {
            let mut stmt = self.conn.prepare_cached(value_sql(kind)?.exists)?;
            let present = stmt
                .query_row(params![id.get()], |_| Ok(()))
                .optional()?
                .is_some();
            if present {
                tables.push(kind);
            }
        }
        Ok(tables)
    }

    fn close(self) -> StoreResult<()> {
        self.conn.close().map_err(|(_, err)| StoreError::from(err))
    }

    fn atomically<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut Self) -> Result<T, E>,
    {
        self.conn
            .execute_batch(SAVEPOINT)
            .map_err(|err| E::from(StoreError::from(err)))?;
        match f(self) {
            Ok(value) => {
                self.conn
                    .execute_batch(RELEASE)
                    .map_err(|err| E::from(StoreError::from(err)))?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = self.conn.execute_batch(ROLLBACK) {
                    warn!(error = %rollback, "savepoint rollback failed");
                } else {
                    debug!("mutation rolled back");
                }
                Err(err)
            }
        }
    }
}
