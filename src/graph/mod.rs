//! Relationship graph consistency layer.
//!
//! - [`edge_store`]: single-record persistence of directed edges
//! - [`manager`]: paired create/delete and deduplicated listing
//! - [`repair`]: detection and healing of dangling mutual edges
//! - [`worker`]: background scheduling of repair

pub mod contacts;
pub mod edge_store;
pub mod error;
pub mod manager;
pub mod repair;
pub mod types;
pub mod worker;

use rusqlite::Connection;
use std::sync::{Arc, Mutex};

use crate::config::KithConfig;
use contacts::SqliteContacts;
use edge_store::{EdgeStore, SqliteEdgeStore};
use manager::{RelationshipManager, RetryPolicy};
use repair::ConsistencyRepair;

/// Wire the SQLite-backed manager and repair over one shared connection.
pub fn sqlite_services(
    db: Arc<Mutex<Connection>>,
    config: &KithConfig,
) -> (RelationshipManager, ConsistencyRepair) {
    let edges: Arc<dyn EdgeStore> = Arc::new(SqliteEdgeStore::new(Arc::clone(&db)));
    let contacts = Arc::new(SqliteContacts::new(db));

    let manager = RelationshipManager::new(Arc::clone(&edges), contacts)
        .with_retry(RetryPolicy::from(&config.relationships));
    let repair = ConsistencyRepair::new(edges, &config.repair);

    (manager, repair)
}
