use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;

use kith::config::KithConfig;
use kith::graph::contacts::insert_contact;
use kith::graph::edge_store::{get_edge, insert_edge};
use kith::graph::error::StoreError;

use super::export::ExportData;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub contacts_imported: u64,
    pub contacts_skipped: u64,
    pub edges_imported: u64,
    pub edges_skipped: u64,
}

/// Insert records whose ids are not stored yet.
///
/// Edges go in verbatim, one at a time, so a one-sided mutual pair in the
/// file stays one-sided until `kith repair` runs.
pub fn apply(conn: &Connection, data: &ExportData) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();

    for contact in &data.contacts {
        if insert_contact(conn, contact)? {
            summary.contacts_imported += 1;
        } else {
            summary.contacts_skipped += 1;
        }
    }

    for edge in &data.relationships {
        if get_edge(conn, &edge.id)?.is_some() {
            summary.edges_skipped += 1;
            continue;
        }
        match insert_edge(conn, edge) {
            Ok(()) => summary.edges_imported += 1,
            // Same (source, target, type) under another id.
            Err(StoreError::AlreadyExists { .. }) => summary.edges_skipped += 1,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(summary)
}

/// Import contacts and relationships from a JSON file produced by `kith export`.
pub fn import(config: &KithConfig, file: &Path) -> Result<()> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read import file: {}", file.display()))?;

    let data: ExportData = serde_json::from_str(&json).context("failed to parse import JSON")?;

    let db_path = config.resolved_db_path();
    let conn = kith::db::open_database(&db_path)?;

    println!(
        "Importing {} contacts and {} relationship edges...",
        data.contacts.len(),
        data.relationships.len()
    );

    let summary = apply(&conn, &data)?;

    println!("Import complete:");
    println!("  Contacts imported: {}", summary.contacts_imported);
    println!("  Contacts skipped:  {} (already exist)", summary.contacts_skipped);
    println!("  Edges imported:    {}", summary.edges_imported);
    println!("  Edges skipped:     {} (already exist)", summary.edges_skipped);

    let report = kith::db::check_database_health(&conn)?;
    if report.dangling_mutual_count > 0 {
        println!(
            "{} mutual edges are missing their reverse edge; run `kith repair`.",
            report.dangling_mutual_count
        );
    }

    Ok(())
}
