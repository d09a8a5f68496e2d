//! SQLite connection and the scoped key-value store built on it

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;

use crate::migrations::run_migrations;
use crate::store::KeyValueStore;
use crate::Result;

pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode so a reload can read while a previous writer is closing
        let _: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    /// Drop every scope other than `keep`, e.g. when a new browser session starts
    pub fn prune_scopes(&self, keep: &str) -> Result<usize> {
        self.with_connection(|conn| {
            let removed = conn.execute("DELETE FROM kv_store WHERE scope != ?1", [keep])?;
            Ok(removed)
        })
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
        }
    }
}

/// Key-value store partitioned by a session scope
#[derive(Clone)]
pub struct SqliteStore {
    db: Database,
    scope: String,
}

impl SqliteStore {
    pub fn new(db: Database, scope: impl Into<String>) -> Self {
        Self {
            db,
            scope: scope.into(),
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Remove every key belonging to this scope
    pub fn clear_scope(&self) -> Result<()> {
        self.db.with_connection(|conn| {
            conn.execute("DELETE FROM kv_store WHERE scope = ?1", [&self.scope])?;
            Ok(())
        })
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.db.with_connection(|conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM kv_store WHERE scope = ?1 AND key = ?2",
                    rusqlite::params![self.scope, key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value)
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let updated_at = Utc::now().to_rfc3339();
        self.db.with_connection(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO kv_store (scope, key, value, updated_at)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![self.scope, key, value, updated_at],
            )?;
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.db.with_connection(|conn| {
            conn.execute(
                "DELETE FROM kv_store WHERE scope = ?1 AND key = ?2",
                rusqlite::params![self.scope, key],
            )?;
            Ok(())
        })
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}
