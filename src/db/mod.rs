pub mod migrations;
pub mod schema;

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;

/// Open (or create) the kith database at the given path with schema
/// initialized and migrations applied.
pub fn open_database(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let conn = Connection::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;

    // WAL lets list/repair reads proceed while a write is in flight
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(std::time::Duration::from_millis(250))?;

    schema::init_schema(&conn).context("failed to initialize schema")?;
    migrations::run_migrations(&conn).context("failed to run migrations")?;

    tracing::info!(path = %path.display(), "database initialized");
    Ok(conn)
}

/// Open an in-memory database with schema and migrations applied.
pub fn open_memory_database() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    schema::init_schema(&conn).context("failed to initialize schema")?;
    migrations::run_migrations(&conn).context("failed to run migrations")?;
    Ok(conn)
}

/// Result of [`check_database_health`].
#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub schema_version: u32,
    pub contact_count: i64,
    pub edge_count: i64,
    pub mutual_edge_count: i64,
    /// Mutual edges with no mutual reciprocal.
    pub dangling_mutual_count: i64,
    pub integrity_ok: bool,
    pub integrity_details: String,
}

/// Row counts, dangling-edge count, and `PRAGMA integrity_check`.
pub fn check_database_health(conn: &Connection) -> Result<HealthReport> {
    let schema_version = migrations::get_schema_version(conn)?;

    let count = |sql: &str| -> rusqlite::Result<i64> { conn.query_row(sql, [], |row| row.get(0)) };

    let contact_count = count("SELECT COUNT(*) FROM contacts")?;
    let edge_count = count("SELECT COUNT(*) FROM relationships")?;
    let mutual_edge_count = count("SELECT COUNT(*) FROM relationships WHERE is_mutual = 1")?;
    let dangling_mutual_count = count(
        "SELECT COUNT(*) FROM relationships r \
         WHERE r.is_mutual = 1 AND NOT EXISTS ( \
             SELECT 1 FROM relationships x \
             WHERE x.source_id = r.target_id AND x.target_id = r.source_id \
               AND x.type = r.type AND x.is_mutual = 1)",
    )?;

    let integrity: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;

    Ok(HealthReport {
        schema_version,
        contact_count,
        edge_count,
        mutual_edge_count,
        dangling_mutual_count,
        integrity_ok: integrity == "ok",
        integrity_details: integrity,
    })
}
