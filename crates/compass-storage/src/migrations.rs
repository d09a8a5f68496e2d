//! Schema migrations
//!
//! Each entry upgrades the schema by exactly one version. The applied
//! version is tracked with SQLite's `user_version` pragma.

use rusqlite::Connection;

use crate::Result;

type Migration = (&'static str, &'static str);

const MIGRATIONS: &[Migration] = &[(
    "scoped key-value store",
    r#"
    CREATE TABLE IF NOT EXISTS kv_store (
        scope TEXT NOT NULL,
        key TEXT NOT NULL,
        value TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        PRIMARY KEY (scope, key)
    );

    CREATE INDEX IF NOT EXISTS idx_kv_store_scope ON kv_store(scope);
    "#,
)];

pub fn schema_version(conn: &Connection) -> Result<usize> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(usize::try_from(version).unwrap_or_default())
}

pub fn run_migrations(conn: &Connection) -> Result<()> {
    let applied = schema_version(conn)?;

    for (index, (name, sql)) in MIGRATIONS.iter().enumerate().skip(applied) {
        let version = index + 1;
        tracing::info!(version, "Running migration: {}", name);

        conn.execute_batch(sql)?;
        conn.pragma_update(None, "user_version", version as i64)?;
    }

    Ok(())
}
