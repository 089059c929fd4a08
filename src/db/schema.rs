//! SQL DDL for all kith tables.
//!
//! Defines the `contacts`, `relationships`, and `schema_meta` tables. All DDL
//! uses `IF NOT EXISTS` for idempotent initialization.
//!
//! `relationships` deliberately has no foreign key into `contacts`: the two
//! collections are written independently, and a dangling edge must stay
//! representable so repair can find it.

use rusqlite::Connection;

const SCHEMA_SQL: &str = r#"
-- Contacts, owned by the contact-CRUD collaborator; read here by id only
CREATE TABLE IF NOT EXISTS contacts (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    owner_id TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_contacts_owner ON contacts(owner_id);

-- One row per directed edge
CREATE TABLE IF NOT EXISTS relationships (
    id TEXT PRIMARY KEY,
    source_id TEXT NOT NULL,
    target_id TEXT NOT NULL,
    type TEXT NOT NULL CHECK(length(type) > 0),
    is_mutual INTEGER NOT NULL DEFAULT 0 CHECK(is_mutual IN (0, 1)),
    created_at TEXT NOT NULL,
    UNIQUE(source_id, target_id, type)
);

CREATE INDEX IF NOT EXISTS idx_relationships_source ON relationships(source_id);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // Set initial schema version if not already present
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}
