#![allow(dead_code)]

use async_trait::async_trait;
use kith::config::RepairConfig;
use kith::db;
use kith::graph::contacts::{insert_contact, SqliteContacts};
use kith::graph::edge_store::{all_edges, EdgeStore, SqliteEdgeStore};
use kith::graph::error::StoreError;
use kith::graph::manager::{RelationshipManager, RetryPolicy};
use kith::graph::repair::{ConsistencyRepair, RepairPolicy};
use kith::graph::types::{Contact, Edge, Identity};
use rusqlite::Connection;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const OWNER: &str = "default";

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Arc<Mutex<Connection>> {
    Arc::new(Mutex::new(db::open_memory_database().unwrap()))
}

pub fn owner() -> Identity {
    Identity::new(OWNER)
}

/// Insert contacts named after their ids, owned by `owner`.
pub fn seed_contacts(db: &Arc<Mutex<Connection>>, owner: &str, ids: &[&str]) {
    let conn = db.lock().unwrap();
    for id in ids {
        insert_contact(
            &conn,
            &Contact {
                id: id.to_string(),
                name: format!("Contact {id}"),
                owner_id: owner.to_string(),
                created_at: "2026-01-01T00:00:00Z".to_string(),
            },
        )
        .unwrap();
    }
}

pub fn sqlite_edges(db: &Arc<Mutex<Connection>>) -> Arc<dyn EdgeStore> {
    Arc::new(SqliteEdgeStore::new(Arc::clone(db)))
}

/// Manager with a retry backoff short enough for tests.
pub fn manager(db: &Arc<Mutex<Connection>>, edges: Arc<dyn EdgeStore>) -> RelationshipManager {
    RelationshipManager::new(edges, Arc::new(SqliteContacts::new(Arc::clone(db)))).with_retry(
        RetryPolicy {
            attempts: 3,
            backoff: Duration::from_millis(1),
        },
    )
}

/// Repair with a tiny page size so full scans cross page boundaries.
pub fn repair(edges: Arc<dyn EdgeStore>, policy: RepairPolicy) -> ConsistencyRepair {
    ConsistencyRepair::new(
        edges,
        &RepairConfig {
            policy,
            page_size: 2,
            ..RepairConfig::default()
        },
    )
}

/// Every stored edge, straight from the table.
pub fn stored_edges(db: &Arc<Mutex<Connection>>) -> Vec<Edge> {
    all_edges(&db.lock().unwrap()).unwrap()
}

/// Calls in `[pass, pass + fail)` fail with `StoreError::Unavailable`.
#[derive(Debug, Clone, Copy)]
struct Fault {
    pass: usize,
    fail: usize,
}

impl Fault {
    fn hits(self, call: usize) -> bool {
        call >= self.pass && call < self.pass.saturating_add(self.fail)
    }
}

/// [`EdgeStore`] wrapper that injects transient failures into creates and
/// deletes, counting calls as it goes. Reads always pass through.
pub struct FlakyEdgeStore {
    inner: Arc<dyn EdgeStore>,
    create_fault: Option<Fault>,
    delete_fault: Option<Fault>,
    create_stall: Option<usize>,
    creates: AtomicUsize,
    deletes: AtomicUsize,
}

impl FlakyEdgeStore {
    pub fn new(inner: Arc<dyn EdgeStore>) -> Self {
        Self {
            inner,
            create_fault: None,
            delete_fault: None,
            create_stall: None,
            creates: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
        }
    }

    /// Let `pass` creates through, then fail the next `fail`.
    pub fn fail_creates(mut self, pass: usize, fail: usize) -> Self {
        self.create_fault = Some(Fault { pass, fail });
        self
    }

    /// Let `pass` deletes through, then fail the next `fail`.
    pub fn fail_deletes(mut self, pass: usize, fail: usize) -> Self {
        self.delete_fault = Some(Fault { pass, fail });
        self
    }

    /// Let `pass` creates through; every later create never completes.
    pub fn stall_creates(mut self, pass: usize) -> Self {
        self.create_stall = Some(pass);
        self
    }

    pub fn create_calls(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

fn injected(fault: Option<Fault>, counter: &AtomicUsize) -> bool {
    let call = counter.fetch_add(1, Ordering::SeqCst);
    fault.is_some_and(|f| f.hits(call))
}

#[async_trait]
impl EdgeStore for FlakyEdgeStore {
    async fn find(
        &self,
        source_id: &str,
        target_id: &str,
        relationship_type: &str,
    ) -> Result<Option<Edge>, StoreError> {
        self.inner.find(source_id, target_id, relationship_type).await
    }

    async fn find_all_by_source(&self, contact_id: &str) -> Result<Vec<Edge>, StoreError> {
        self.inner.find_all_by_source(contact_id).await
    }

    async fn find_all_by_target(&self, contact_id: &str) -> Result<Vec<Edge>, StoreError> {
        self.inner.find_all_by_target(contact_id).await
    }

    async fn create(&self, edge: Edge) -> Result<Edge, StoreError> {
        let call = self.creates.fetch_add(1, Ordering::SeqCst);
        if self.create_stall.is_some_and(|pass| call >= pass) {
            std::future::pending::<()>().await;
        }
        if self.create_fault.is_some_and(|f| f.hits(call)) {
            return Err(StoreError::Unavailable("injected create failure".into()));
        }
        self.inner.create(edge).await
    }

    async fn delete(&self, edge_id: &str) -> Result<(), StoreError> {
        if injected(self.delete_fault, &self.deletes) {
            return Err(StoreError::Unavailable("injected delete failure".into()));
        }
        self.inner.delete(edge_id).await
    }

    async fn set_mutual(&self, edge_id: &str, is_mutual: bool) -> Result<Edge, StoreError> {
        self.inner.set_mutual(edge_id, is_mutual).await
    }

    async fn list_page(
        &self,
        after_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Edge>, StoreError> {
        self.inner.list_page(after_id, limit).await
    }
}

/// [`EdgeStore`] wrapper whose first `misses` calls to `find` report nothing,
/// as if another writer's edge landed right after the read. Everything else
/// passes through.
pub struct StaleReadEdgeStore {
    inner: Arc<dyn EdgeStore>,
    misses: usize,
    finds: AtomicUsize,
}

impl StaleReadEdgeStore {
    pub fn new(inner: Arc<dyn EdgeStore>, misses: usize) -> Self {
        Self {
            inner,
            misses,
            finds: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EdgeStore for StaleReadEdgeStore {
    async fn find(
        &self,
        source_id: &str,
        target_id: &str,
        relationship_type: &str,
    ) -> Result<Option<Edge>, StoreError> {
        if self.finds.fetch_add(1, Ordering::SeqCst) < self.misses {
            return Ok(None);
        }
        self.inner.find(source_id, target_id, relationship_type).await
    }

    async fn find_all_by_source(&self, contact_id: &str) -> Result<Vec<Edge>, StoreError> {
        self.inner.find_all_by_source(contact_id).await
    }

    async fn find_all_by_target(&self, contact_id: &str) -> Result<Vec<Edge>, StoreError> {
        self.inner.find_all_by_target(contact_id).await
    }

    async fn create(&self, edge: Edge) -> Result<Edge, StoreError> {
        self.inner.create(edge).await
    }

    async fn delete(&self, edge_id: &str) -> Result<(), StoreError> {
        self.inner.delete(edge_id).await
    }

    async fn set_mutual(&self, edge_id: &str, is_mutual: bool) -> Result<Edge, StoreError> {
        self.inner.set_mutual(edge_id, is_mutual).await
    }

    async fn list_page(
        &self,
        after_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Edge>, StoreError> {
        self.inner.list_page(after_id, limit).await
    }
}
