//! Raw edge persistence.
//!
//! [`EdgeStore`] is the only shared mutable resource in the graph layer. It
//! guarantees per-record atomicity and nothing more: no call here touches a
//! second edge, and nothing spans two calls.
//!
//! The free functions operate on a borrowed [`Connection`] for synchronous
//! callers (import, tests); [`SqliteEdgeStore`] wraps them for async callers.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, PoisonError};

use super::error::StoreError;
use super::types::Edge;

/// Single-record edge persistence. No business rules.
#[async_trait]
pub trait EdgeStore: Send + Sync {
    /// Look up the edge for an exact (source, target, type).
    async fn find(
        &self,
        source_id: &str,
        target_id: &str,
        relationship_type: &str,
    ) -> Result<Option<Edge>, StoreError>;

    /// Edges whose source is `contact_id`, in store order.
    async fn find_all_by_source(&self, contact_id: &str) -> Result<Vec<Edge>, StoreError>;

    /// Edges whose target is `contact_id`, in store order.
    async fn find_all_by_target(&self, contact_id: &str) -> Result<Vec<Edge>, StoreError>;

    /// Persist `edge`. Fails with [`StoreError::AlreadyExists`] if its
    /// (source, target, type) is taken.
    async fn create(&self, edge: Edge) -> Result<Edge, StoreError>;

    /// Delete by id. Fails with [`StoreError::NotFound`] if absent.
    async fn delete(&self, edge_id: &str) -> Result<(), StoreError>;

    /// Flip the mutual flag in place. Used to join a one-way edge into a
    /// mutual pair, and by repair.
    async fn set_mutual(&self, edge_id: &str, is_mutual: bool) -> Result<Edge, StoreError>;

    /// Up to `limit` edges ordered by id, strictly after `after_id`.
    async fn list_page(&self, after_id: Option<&str>, limit: usize)
        -> Result<Vec<Edge>, StoreError>;
}

const EDGE_COLUMNS: &str = "id, source_id, target_id, type, is_mutual, created_at";

fn edge_from_row(row: &Row<'_>) -> rusqlite::Result<Edge> {
    Ok(Edge {
        id: row.get(0)?,
        source_id: row.get(1)?,
        target_id: row.get(2)?,
        relationship_type: row.get(3)?,
        is_mutual: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

pub fn find_edge(
    conn: &Connection,
    source_id: &str,
    target_id: &str,
    relationship_type: &str,
) -> Result<Option<Edge>, StoreError> {
    let edge = conn
        .query_row(
            &format!(
                "SELECT {EDGE_COLUMNS} FROM relationships \
                 WHERE source_id = ?1 AND target_id = ?2 AND type = ?3"
            ),
            params![source_id, target_id, relationship_type],
            edge_from_row,
        )
        .optional()?;
    Ok(edge)
}

pub fn get_edge(conn: &Connection, edge_id: &str) -> Result<Option<Edge>, StoreError> {
    let edge = conn
        .query_row(
            &format!("SELECT {EDGE_COLUMNS} FROM relationships WHERE id = ?1"),
            params![edge_id],
            edge_from_row,
        )
        .optional()?;
    Ok(edge)
}

fn edges_where(conn: &Connection, column: &str, contact_id: &str) -> Result<Vec<Edge>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {EDGE_COLUMNS} FROM relationships WHERE {column} = ?1 ORDER BY rowid"
    ))?;
    let edges = stmt
        .query_map(params![contact_id], edge_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(edges)
}

pub fn edges_by_source(conn: &Connection, contact_id: &str) -> Result<Vec<Edge>, StoreError> {
    edges_where(conn, "source_id", contact_id)
}

pub fn edges_by_target(conn: &Connection, contact_id: &str) -> Result<Vec<Edge>, StoreError> {
    edges_where(conn, "target_id", contact_id)
}

pub fn insert_edge(conn: &Connection, edge: &Edge) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO relationships (id, source_id, target_id, type, is_mutual, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            edge.id,
            edge.source_id,
            edge.target_id,
            edge.relationship_type,
            edge.is_mutual,
            edge.created_at,
        ],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            StoreError::AlreadyExists {
                source_id: edge.source_id.clone(),
                target_id: edge.target_id.clone(),
                relationship_type: edge.relationship_type.clone(),
            }
        } else {
            StoreError::Database(e)
        }
    })?;
    Ok(())
}

pub fn delete_edge(conn: &Connection, edge_id: &str) -> Result<(), StoreError> {
    let deleted = conn.execute("DELETE FROM relationships WHERE id = ?1", params![edge_id])?;
    if deleted == 0 {
        return Err(StoreError::NotFound(edge_id.to_string()));
    }
    Ok(())
}

pub fn update_mutual(conn: &Connection, edge_id: &str, is_mutual: bool) -> Result<Edge, StoreError> {
    let updated = conn.execute(
        "UPDATE relationships SET is_mutual = ?1 WHERE id = ?2",
        params![is_mutual, edge_id],
    )?;
    if updated == 0 {
        return Err(StoreError::NotFound(edge_id.to_string()));
    }
    get_edge(conn, edge_id)?.ok_or_else(|| StoreError::NotFound(edge_id.to_string()))
}

pub fn edges_page(
    conn: &Connection,
    after_id: Option<&str>,
    limit: usize,
) -> Result<Vec<Edge>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {EDGE_COLUMNS} FROM relationships \
         WHERE ?1 IS NULL OR id > ?1 ORDER BY id LIMIT ?2"
    ))?;
    let edges = stmt
        .query_map(params![after_id, limit as i64], edge_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(edges)
}

/// All edges, for export.
pub fn all_edges(conn: &Connection) -> Result<Vec<Edge>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {EDGE_COLUMNS} FROM relationships ORDER BY created_at, id"
    ))?;
    let edges = stmt
        .query_map([], edge_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(edges)
}

/// SQLite-backed [`EdgeStore`]. Queries run on the blocking pool so callers
/// only suspend at store calls.
#[derive(Clone)]
pub struct SqliteEdgeStore {
    db: Arc<Mutex<Connection>>,
}

impl SqliteEdgeStore {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            // Every write is one statement, so a panicked holder leaves no
            // half-applied state behind.
            let conn = db.lock().unwrap_or_else(PoisonError::into_inner);
            f(&*conn)
        })
        .await?
    }
}

#[async_trait]
impl EdgeStore for SqliteEdgeStore {
    async fn find(
        &self,
        source_id: &str,
        target_id: &str,
        relationship_type: &str,
    ) -> Result<Option<Edge>, StoreError> {
        let (source_id, target_id, relationship_type) = (
            source_id.to_string(),
            target_id.to_string(),
            relationship_type.to_string(),
        );
        self.with_conn(move |conn| find_edge(conn, &source_id, &target_id, &relationship_type))
            .await
    }

    async fn find_all_by_source(&self, contact_id: &str) -> Result<Vec<Edge>, StoreError> {
        let contact_id = contact_id.to_string();
        self.with_conn(move |conn| edges_by_source(conn, &contact_id)).await
    }

    async fn find_all_by_target(&self, contact_id: &str) -> Result<Vec<Edge>, StoreError> {
        let contact_id = contact_id.to_string();
        self.with_conn(move |conn| edges_by_target(conn, &contact_id)).await
    }

    async fn create(&self, edge: Edge) -> Result<Edge, StoreError> {
        self.with_conn(move |conn| {
            insert_edge(conn, &edge)?;
            tracing::debug!(
                id = %edge.id,
                source = %edge.source_id,
                target = %edge.target_id,
                relationship_type = %edge.relationship_type,
                mutual = edge.is_mutual,
                "edge created"
            );
            Ok(edge)
        })
        .await
    }

    async fn delete(&self, edge_id: &str) -> Result<(), StoreError> {
        let edge_id = edge_id.to_string();
        self.with_conn(move |conn| {
            delete_edge(conn, &edge_id)?;
            tracing::debug!(id = %edge_id, "edge deleted");
            Ok(())
        })
        .await
    }

    async fn set_mutual(&self, edge_id: &str, is_mutual: bool) -> Result<Edge, StoreError> {
        let edge_id = edge_id.to_string();
        self.with_conn(move |conn| update_mutual(conn, &edge_id, is_mutual))
            .await
    }

    async fn list_page(
        &self,
        after_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Edge>, StoreError> {
        let after_id = after_id.map(str::to_string);
        self.with_conn(move |conn| edges_page(conn, after_id.as_deref(), limit))
            .await
    }
}
