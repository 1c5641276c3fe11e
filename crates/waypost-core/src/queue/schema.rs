//! SQLite schema for the durable queue
//!
//! The queue is the source of truth for records captured while offline.
//! The one-pending-record-per-business-key invariant is enforced here with
//! a partial unique index rather than an application-level check, so it
//! holds under concurrent writers too.

use rusqlite::{Connection, Result};

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_info (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        -- Locally captured records awaiting (or done with) reconciliation
        CREATE TABLE IF NOT EXISTS records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            collection TEXT NOT NULL,
            business_key TEXT NOT NULL,
            payload TEXT NOT NULL,
            sync_state INTEGER NOT NULL DEFAULT 0,
            last_rejection TEXT,
            created_at INTEGER NOT NULL
        );

        -- Exactly one pending record per (collection, business_key).
        -- Synced rows are excluded so a key can be captured again after
        -- its earlier record was reconciled.
        CREATE UNIQUE INDEX IF NOT EXISTS idx_records_pending_key
            ON records(collection, business_key)
            WHERE sync_state = 0;

        -- Drains scan by state
        CREATE INDEX IF NOT EXISTS idx_records_sync_state
            ON records(sync_state);
        "#,
    )?;

    // Set schema version
    conn.execute(
        "INSERT OR REPLACE INTO schema_info (key, value) VALUES ('version', ?)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<Option<i32>> {
    let mut stmt = conn.prepare("SELECT value FROM schema_info WHERE key = 'version'")?;
    let result: Result<String> = stmt.query_row([], |row| row.get(0));

    match result {
        Ok(version_str) => Ok(version_str.parse().ok()),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Check if schema needs initialization or migration
pub fn needs_init(conn: &Connection) -> bool {
    let table_exists: bool = conn
        .prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_info'")
        .and_then(|mut stmt| stmt.exists([]))
        .unwrap_or(false);

    if !table_exists {
        return true;
    }

    match get_schema_version(conn) {
        Ok(Some(v)) => v < SCHEMA_VERSION,
        _ => true,
    }
}
