//! Error types for edge storage and relationship operations

use rusqlite::ErrorCode;
use thiserror::Error;

use super::types::LogicalRelationship;

/// Errors from a single [`EdgeStore`](super::edge_store::EdgeStore) call.
#[derive(Error, Debug)]
pub enum StoreError {
    /// An edge with the same (source, target, type) is already stored
    #[error("edge already exists: {source_id} -> {target_id} ({relationship_type})")]
    AlreadyExists {
        source_id: String,
        target_id: String,
        relationship_type: String,
    },

    /// No edge with this id
    #[error("edge not found: {0}")]
    NotFound(String),

    /// The store could not be reached; safe to retry
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The blocking task running the query panicked or was cancelled
    #[error("store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl StoreError {
    /// Whether the same call may succeed if retried.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unavailable(_) | Self::Task(_) => true,
            Self::Database(rusqlite::Error::SqliteFailure(e, _)) => {
                matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
            }
            _ => false,
        }
    }
}

/// Which paired operation a partial write interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairedOperation {
    Create,
    Delete,
}

impl std::fmt::Display for PairedOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => f.write_str("create"),
            Self::Delete => f.write_str("delete"),
        }
    }
}

/// Errors surfaced by [`RelationshipManager`](super::manager::RelationshipManager).
#[derive(Error, Debug)]
pub enum RelationshipError {
    /// Malformed input, rejected before any write
    #[error("invalid relationship: {0}")]
    Validation(String),

    /// A referenced contact or edge does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// The directed edge already exists; retrying will not help
    #[error("relationship already exists: {0}")]
    Conflict(String),

    /// The primary edge write took effect but its reciprocal did not.
    /// Repair will converge the pair.
    #[error("partial {operation}: primary edge applied, reciprocal failed ({cause}); left for repair")]
    PartialWrite {
        operation: PairedOperation,
        relationship: LogicalRelationship,
        #[source]
        cause: StoreError,
    },

    /// Storage failure before anything was written
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl RelationshipError {
    /// `true` when the caller's primary effect did happen.
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::PartialWrite { .. })
    }
}
