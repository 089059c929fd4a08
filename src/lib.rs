//! Relationship graph consistency layer for a personal contact manager.
//!
//! A relationship between two contacts is stored as directed edge records. A
//! *mutual* relationship is two edges, A → B and B → A, written independently
//! with no transaction spanning them. kith makes that look like one undirected
//! relationship:
//!
//! | Component | Role |
//! |-----------|------|
//! | [`graph::edge_store`] | Create/find/delete one directed edge. No business rules. |
//! | [`graph::manager`] | Paired writes and deletes, deduplicated listing |
//! | [`graph::repair`] | Finds and heals mutual edges whose reciprocal is missing |
//!
//! The reciprocal write always follows the primary one and is retried a few
//! times on transient errors. If it still fails, the primary edge stays, the
//! caller gets a partial-write warning, and repair converges the pair later.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`db`]: SQLite database initialization, schema, migrations, and health checks
//! - [`graph`]: Edge storage, relationship manager, and consistency repair

pub mod config;
pub mod db;
pub mod graph;
