use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, FixedOffset};
use rusqlite::{params, params_from_iter, types::Type, Connection, OptionalExtension, Row};

use super::types::{PinRecord, PinnedItem};
use super::Store;
use crate::error::StoreError;

/// Fixed-width storage form: second precision, explicit offset. All rows
/// carry the same configured offset, so sqlite's textual `>` comparison
/// orders them correctly.
const STORED_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%:z";

const ITEM_COLUMNS: &str = "sequence, remote_id, text, pinned_at, attachment";

/// SQLite-backed mirror of the remote pinned collection.
///
/// Uses a `Mutex<Option<Connection>>` for thread-safe interior mutability;
/// the `Option` makes `close()` idempotent. The database is created and
/// migrated on `open()`.
pub struct SqliteStore {
    conn: Mutex<Option<Connection>>,
    fresh: bool,
}

impl SqliteStore {
    /// Open (or create) a sqlite database at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::from_conn(Connection::open(path)?)
    }

    /// Open an in-memory database (useful for tests).
    pub fn open_memory() -> Result<Self, StoreError> {
        Self::from_conn(Connection::open_in_memory()?)
    }

    fn from_conn(conn: Connection) -> Result<Self, StoreError> {
        let fresh = !table_exists(&conn, "pinned_items")?;
        let store = Self {
            conn: Mutex::new(Some(conn)),
            fresh,
        };
        store.migrate()?;
        Ok(store)
    }

    /// True when the mirror table did not exist before this open.
    ///
    /// A fresh store has no watermark baseline, which forces the
    /// last-update policy onto the time-window fallback for the first run.
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    fn migrate(&self) -> Result<(), StoreError> {
        // AUTOINCREMENT: sequences must never be reused, even after a prune
        // deletes the highest row.
        self.with_conn(|conn| {
            conn.execute_batch(
                "
                CREATE TABLE IF NOT EXISTS pinned_items (
                    sequence   INTEGER PRIMARY KEY AUTOINCREMENT,
                    remote_id  INTEGER NOT NULL UNIQUE,
                    text       TEXT NOT NULL,
                    pinned_at  TEXT NOT NULL,
                    attachment BLOB
                );
                ",
            )?;
            Ok(())
        })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let guard = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;
        f(conn)
    }
}

impl Store for SqliteStore {
    fn upsert_many(&self, items: &[PinRecord]) -> Result<(), StoreError> {
        if items.is_empty() {
            return Ok(());
        }
        self.with_conn(|conn| {
            // OR IGNORE: the first captured version of an item wins, even
            // when the remote text was edited since.
            let mut stmt = conn.prepare(
                "INSERT OR IGNORE INTO pinned_items (remote_id, text, pinned_at, attachment)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for item in items {
                stmt.execute(params![
                    item.remote_id,
                    item.text,
                    fmt_stored(item.pinned_at),
                    item.attachment,
                ])?;
            }
            Ok(())
        })
    }

    fn prune(&self, keep_ids: &HashSet<i64>) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            if keep_ids.is_empty() {
                conn.execute("DELETE FROM pinned_items", [])?;
                return Ok(());
            }
            let placeholders = vec!["?"; keep_ids.len()].join(", ");
            let sql =
                format!("DELETE FROM pinned_items WHERE remote_id NOT IN ({placeholders})");
            conn.execute(&sql, params_from_iter(keep_ids.iter()))?;
            Ok(())
        })
    }

    fn count(&self) -> Result<u64, StoreError> {
        self.with_conn(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM pinned_items", [], |row| row.get(0))?;
            Ok(count as u64)
        })
    }

    fn max_pinned_at(&self) -> Result<Option<DateTime<FixedOffset>>, StoreError> {
        self.with_conn(|conn| {
            let max: Option<String> =
                conn.query_row("SELECT MAX(pinned_at) FROM pinned_items", [], |row| {
                    row.get(0)
                })?;
            max.map(|raw| parse_stored(&raw)).transpose()
        })
    }

    fn get_by_id(&self, remote_id: i64) -> Result<Option<PinnedItem>, StoreError> {
        self.with_conn(|conn| {
            let item = conn
                .query_row(
                    &format!("SELECT {ITEM_COLUMNS} FROM pinned_items WHERE remote_id = ?1"),
                    params![remote_id],
                    row_to_item,
                )
                .optional()?;
            Ok(item)
        })
    }

    fn query_since(&self, threshold: DateTime<FixedOffset>) -> Result<Vec<PinnedItem>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ITEM_COLUMNS} FROM pinned_items
                 WHERE pinned_at > ?1 ORDER BY remote_id ASC"
            ))?;
            let rows = stmt.query_map(params![fmt_stored(threshold)], row_to_item)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
    }

    fn query_since_sequence(&self, seq: i64) -> Result<Vec<PinnedItem>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ITEM_COLUMNS} FROM pinned_items
                 WHERE sequence >= ?1 ORDER BY sequence ASC"
            ))?;
            let rows = stmt.query_map(params![seq], row_to_item)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
    }

    fn sample(&self, limit: usize) -> Result<Vec<PinnedItem>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ITEM_COLUMNS} FROM pinned_items ORDER BY RANDOM() LIMIT ?1"
            ))?;
            let rows = stmt.query_map(params![limit as i64], row_to_item)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
    }

    fn close(&self) -> Result<(), StoreError> {
        let mut guard = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        if let Some(conn) = guard.take() {
            conn.close().map_err(|(_, e)| StoreError::Sqlite(e))?;
        }
        Ok(())
    }
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool, StoreError> {
    let found = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
            params![name],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn fmt_stored(value: DateTime<FixedOffset>) -> String {
    value.format(STORED_TIME_FORMAT).to_string()
}

fn parse_stored(raw: &str) -> Result<DateTime<FixedOffset>, StoreError> {
    DateTime::parse_from_str(raw, STORED_TIME_FORMAT).map_err(|source| StoreError::Timestamp {
        value: raw.to_string(),
        source,
    })
}

fn row_to_item(row: &Row<'_>) -> rusqlite::Result<PinnedItem> {
    let raw: String = row.get(3)?;
    let pinned_at = DateTime::parse_from_str(&raw, STORED_TIME_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
    Ok(PinnedItem {
        sequence: row.get(0)?,
        remote_id: row.get(1)?,
        text: row.get(2)?,
        pinned_at,
        attachment: row.get(4)?,
    })
}
