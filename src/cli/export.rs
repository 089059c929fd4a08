use anyhow::Result;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use kith::config::KithConfig;
use kith::graph::contacts::all_contacts;
use kith::graph::edge_store::all_edges;
use kith::graph::types::{Contact, Edge};

/// Export format: every contact and every stored edge, as persisted.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExportData {
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub relationships: Vec<Edge>,
}

pub fn collect(conn: &Connection) -> Result<ExportData> {
    Ok(ExportData {
        contacts: all_contacts(conn)?,
        relationships: all_edges(conn)?,
    })
}

/// Export all contacts and relationship edges as JSON to stdout.
pub fn export(config: &KithConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = kith::db::open_database(&db_path)?;

    let data = collect(&conn)?;

    let json = serde_json::to_string_pretty(&data)?;
    println!("{json}");

    eprintln!(
        "Exported {} contacts and {} relationship edges.",
        data.contacts.len(),
        data.relationships.len()
    );

    Ok(())
}
