//! Background worker that keeps the graph converging.

use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::interval;

use super::repair::{ConsistencyRepair, RepairScope};

/// A contact whose edges were left half-written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairHint {
    pub contact_id: String,
}

/// Runs a full repair scan on a fixed interval and a contact-scoped scan for
/// every hint the [`RelationshipManager`](super::manager::RelationshipManager)
/// sends after a partial write.
pub struct RepairWorker {
    repair: ConsistencyRepair,
    interval: Duration,
    hints: mpsc::UnboundedReceiver<RepairHint>,
}

impl RepairWorker {
    /// Returns the worker and the sender to hand to the manager.
    pub fn new(
        repair: ConsistencyRepair,
        interval: Duration,
    ) -> (Self, mpsc::UnboundedSender<RepairHint>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = Self {
            repair,
            interval,
            hints: rx,
        };
        (worker, tx)
    }

    /// Run until `shutdown` resolves. The first full scan starts immediately.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) {
        let mut ticker = interval(self.interval);
        tokio::pin!(shutdown);

        tracing::info!(interval = ?self.interval, policy = %self.repair.policy(), "repair worker started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    run_scan(&self.repair, &RepairScope::All).await;
                }
                Some(hint) = self.hints.recv() => {
                    let contacts = drain_hints(hint, &mut self.hints);
                    tracing::debug!(contacts = contacts.len(), "repair hints received");
                    for contact_id in contacts {
                        run_scan(&self.repair, &RepairScope::Contact(contact_id)).await;
                    }
                }
                _ = &mut shutdown => {
                    tracing::info!("shutdown signal received, stopping repair worker");
                    break;
                }
            }
        }
    }
}

/// `first` plus every hint already queued, one entry per contact.
fn drain_hints(
    first: RepairHint,
    hints: &mut mpsc::UnboundedReceiver<RepairHint>,
) -> BTreeSet<String> {
    let mut contacts = BTreeSet::from([first.contact_id]);
    while let Ok(hint) = hints.try_recv() {
        contacts.insert(hint.contact_id);
    }
    contacts
}

async fn run_scan(repair: &ConsistencyRepair, scope: &RepairScope) {
    match repair.scan(scope).await {
        Ok(report) => tracing::debug!("{}", report.summary()),
        Err(e) => tracing::error!(%scope, error = %e, "repair scan failed"),
    }
}
