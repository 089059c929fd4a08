pub mod doctor;
pub mod export;
pub mod import;
pub mod relationships;
pub mod repair;

use anyhow::Result;
use kith::config::KithConfig;
use kith::graph::manager::RelationshipManager;
use kith::graph::repair::ConsistencyRepair;
use std::sync::{Arc, Mutex};

/// Open the configured database and build the relationship services over it.
fn open_services(config: &KithConfig) -> Result<(RelationshipManager, ConsistencyRepair)> {
    let db_path = config.resolved_db_path();
    let conn = kith::db::open_database(&db_path)?;
    Ok(kith::graph::sqlite_services(
        Arc::new(Mutex::new(conn)),
        config,
    ))
}
