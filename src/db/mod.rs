pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;

/// Open (or create) the MindCache database at the given path with schema initialized.
pub fn open_database(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let conn = Connection::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;

    // The CLI and the running service may open the same file.
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.busy_timeout(std::time::Duration::from_millis(5000))?;

    schema::init_schema(&conn).context("failed to initialize schema")?;

    tracing::info!(path = %path.display(), "database initialized");
    Ok(conn)
}

/// Open an in-memory database with schema initialized.
pub fn open_memory_database() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    schema::init_schema(&conn).context("failed to initialize schema")?;
    Ok(conn)
}

/// Result of [`check_database_health`].
#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub integrity_ok: bool,
    pub integrity_details: String,
    pub schema_version: u32,
    pub installed_at: Option<String>,
    pub key_count: u64,
    /// `(key, bytes)` for every stored key, largest first.
    pub key_sizes: Vec<(String, u64)>,
}

/// Run `PRAGMA integrity_check` and collect per-key sizes.
pub fn check_database_health(conn: &Connection) -> Result<HealthReport> {
    let integrity_details: String =
        conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
    let schema_version = schema::schema_version(conn)?;
    let installed_at = schema::installed_at(conn)?;

    let mut stmt = conn.prepare(
        "SELECT key, LENGTH(value) FROM kv_store ORDER BY LENGTH(value) DESC, key",
    )?;
    let key_sizes: Vec<(String, u64)> = stmt
        .query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(HealthReport {
        integrity_ok: integrity_details == "ok",
        integrity_details,
        schema_version,
        installed_at,
        key_count: key_sizes.len() as u64,
        key_sizes,
    })
}
