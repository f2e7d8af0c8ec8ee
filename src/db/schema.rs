//! SQL DDL for the MindCache storage tables.
//!
//! Extension-local storage is a flat key → JSON namespace, so there is a single
//! `kv_store` table plus `schema_meta`. All DDL uses `IF NOT EXISTS` for
//! idempotent initialization.

use rusqlite::{Connection, OptionalExtension};

/// Layout version written into `schema_meta` when a store is created.
pub const SCHEMA_VERSION: u32 = 1;

const SCHEMA_SQL: &str = r#"
-- Flat key/value namespace (value is a JSON document)
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables and stamp a new store with its version and
/// creation time. Idempotent: an existing store keeps its original stamps.
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('installed_at', ?1)",
        [chrono::Utc::now().to_rfc3339()],
    )?;

    Ok(())
}

fn meta_value(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM schema_meta WHERE key = ?1",
        [key],
        |row| row.get(0),
    )
    .optional()
}

/// Version stamped into the store, or 0 if missing or unreadable.
pub fn schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    Ok(meta_value(conn, "schema_version")?
        .and_then(|v| v.parse().ok())
        .unwrap_or(0))
}

/// When the store was first created (RFC 3339).
pub fn installed_at(conn: &Connection) -> rusqlite::Result<Option<String>> {
    meta_value(conn, "installed_at")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_all_tables() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"kv_store".to_string()));
        assert!(tables.contains(&"schema_meta".to_string()));
    }

    #[test]
    fn new_store_is_stamped() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        assert_eq!(schema_version(&conn).unwrap(), SCHEMA_VERSION);
        let installed = installed_at(&conn).unwrap().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(&installed).is_ok());
    }

    #[test]
    fn reinit_keeps_original_stamps() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let first = installed_at(&conn).unwrap();

        init_schema(&conn).unwrap();
        assert_eq!(installed_at(&conn).unwrap(), first);
        assert_eq!(schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn unstamped_store_reports_nothing() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA_SQL).unwrap();
        assert_eq!(schema_version(&conn).unwrap(), 0);
        assert!(installed_at(&conn).unwrap().is_none());
    }
}
