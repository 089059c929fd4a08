//! Detection and healing of dangling mutual edges.
//!
//! A dangling mutual edge is an `is_mutual` edge with no mutual reciprocal,
//! left behind when the second write of a paired create or delete did not
//! happen. [`ConsistencyRepair::scan`] finds them and, under the default
//! [`RepairPolicy::Recreate`], writes the missing half.
//!
//! Repair never deletes. It only adds a reciprocal or flips a mutual flag,
//! so it can run alongside normal traffic. A failure on one edge is recorded
//! in the [`RepairReport`] and the scan moves on.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::edge_store::EdgeStore;
use super::error::StoreError;
use super::types::Edge;
use crate::config::RepairConfig;

/// What to do with a dangling mutual edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairPolicy {
    /// Write the missing reciprocal (or mark an existing one mutual).
    #[default]
    Recreate,
    /// Mark the dangling edge itself one-directional.
    Downgrade,
}

impl std::fmt::Display for RepairPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Recreate => f.write_str("recreate"),
            Self::Downgrade => f.write_str("downgrade"),
        }
    }
}

/// Which edges a scan looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairScope {
    /// Edges where this contact is the source or the target.
    Contact(String),
    /// Every edge in the store, paged.
    All,
}

impl std::fmt::Display for RepairScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Contact(id) => write!(f, "contact:{id}"),
            Self::All => f.write_str("all"),
        }
    }
}

/// Outcome for one dangling edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RepairAction {
    /// The missing reciprocal was written.
    Recreated { reciprocal_id: String },
    /// A one-directional reciprocal existed and was marked mutual.
    UpgradedReciprocal { reciprocal_id: String },
    /// The dangling edge was marked one-directional.
    Downgraded,
    /// Someone else wrote the reciprocal while we were looking.
    AlreadyHealed,
    /// The edge was deleted or stopped being mutual before we could act.
    Vanished,
    /// Dry run: would have been repaired.
    Detected,
    /// Could not be healed this time; the next scan will retry.
    Failed { error: String },
}

impl RepairAction {
    fn is_write(&self) -> bool {
        matches!(
            self,
            Self::Recreated { .. } | Self::UpgradedReciprocal { .. } | Self::Downgraded
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RepairFinding {
    pub edge: Edge,
    #[serde(flatten)]
    pub action: RepairAction,
}

#[derive(Debug, Clone, Serialize)]
pub struct RepairReport {
    pub scope: String,
    pub policy: RepairPolicy,
    pub dry_run: bool,
    pub edges_scanned: usize,
    /// Store writes performed.
    pub writes: usize,
    /// One entry per dangling mutual edge found.
    pub findings: Vec<RepairFinding>,
}

impl RepairReport {
    fn new(scope: &RepairScope, policy: RepairPolicy, dry_run: bool) -> Self {
        Self {
            scope: scope.to_string(),
            policy,
            dry_run,
            edges_scanned: 0,
            writes: 0,
            findings: Vec::new(),
        }
    }

    fn record(&mut self, edge: Edge, action: RepairAction) {
        if action.is_write() {
            self.writes += 1;
        }
        self.findings.push(RepairFinding { edge, action });
    }

    /// Dangling mutual edges detected, healed or not.
    pub fn inconsistencies(&self) -> usize {
        self.findings.len()
    }

    pub fn healed(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| f.action.is_write() || f.action == RepairAction::AlreadyHealed)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| matches!(f.action, RepairAction::Failed { .. }))
            .count()
    }

    pub fn summary(&self) -> String {
        format!(
            "scope {}: scanned {} edges, {} inconsistencies, {} healed, {} failed, {} writes{}",
            self.scope,
            self.edges_scanned,
            self.inconsistencies(),
            self.healed(),
            self.failed(),
            self.writes,
            if self.dry_run { " (dry run)" } else { "" },
        )
    }
}

#[derive(Clone)]
pub struct ConsistencyRepair {
    edges: Arc<dyn EdgeStore>,
    policy: RepairPolicy,
    page_size: usize,
}

impl ConsistencyRepair {
    pub fn new(edges: Arc<dyn EdgeStore>, config: &RepairConfig) -> Self {
        Self {
            edges,
            policy: config.policy,
            page_size: config.page_size.max(1),
        }
    }

    pub fn policy(&self) -> RepairPolicy {
        self.policy
    }

    /// Find and heal dangling mutual edges within `scope`.
    ///
    /// Only failing to enumerate edges is an error; per-edge failures land in
    /// the report.
    pub async fn scan(&self, scope: &RepairScope) -> Result<RepairReport, StoreError> {
        self.run(scope, false).await
    }

    /// Report dangling mutual edges within `scope` without writing anything.
    pub async fn detect(&self, scope: &RepairScope) -> Result<RepairReport, StoreError> {
        self.run(scope, true).await
    }

    async fn run(&self, scope: &RepairScope, dry_run: bool) -> Result<RepairReport, StoreError> {
        let mut report = RepairReport::new(scope, self.policy, dry_run);

        match scope {
            RepairScope::Contact(contact_id) => {
                let (forward, reverse) = tokio::try_join!(
                    self.edges.find_all_by_source(contact_id),
                    self.edges.find_all_by_target(contact_id),
                )?;
                let mut seen = HashSet::new();
                for edge in forward.into_iter().chain(reverse) {
                    if seen.insert(edge.id.clone()) {
                        self.check_edge(edge, &mut report).await;
                    }
                }
            }
            RepairScope::All => {
                let mut cursor: Option<String> = None;
                loop {
                    let page = self
                        .edges
                        .list_page(cursor.as_deref(), self.page_size)
                        .await?;
                    let last = match page.last() {
                        Some(edge) => edge.id.clone(),
                        None => break,
                    };
                    let full = page.len() == self.page_size;
                    for edge in page {
                        self.check_edge(edge, &mut report).await;
                    }
                    if !full {
                        break;
                    }
                    cursor = Some(last);
                }
            }
        }

        if report.inconsistencies() > 0 {
            info!("repair finished: {}", report.summary());
        }
        Ok(report)
    }

    async fn check_edge(&self, edge: Edge, report: &mut RepairReport) {
        report.edges_scanned += 1;
        if !edge.is_mutual {
            return;
        }

        let reciprocal = match self
            .edges
            .find(&edge.target_id, &edge.source_id, &edge.relationship_type)
            .await
        {
            Ok(Some(reciprocal)) if reciprocal.is_mutual => return,
            Ok(found) => found,
            Err(e) => {
                error!(edge = %edge.id, error = %e, "could not check reciprocal");
                report.record(edge, RepairAction::Failed { error: e.to_string() });
                return;
            }
        };

        warn!(
            edge = %edge.id,
            source = %edge.source_id,
            target = %edge.target_id,
            relationship_type = %edge.relationship_type,
            "dangling mutual edge"
        );

        let action = if report.dry_run {
            RepairAction::Detected
        } else {
            match self.heal(&edge, reciprocal).await {
                Ok(action) => action,
                Err(e) => {
                    error!(edge = %edge.id, error = %e, "repair failed");
                    RepairAction::Failed { error: e.to_string() }
                }
            }
        };

        if action.is_write() {
            info!(edge = %edge.id, ?action, "dangling mutual edge repaired");
        }
        report.record(edge, action);
    }

    async fn heal(&self, edge: &Edge, reciprocal: Option<Edge>) -> Result<RepairAction, StoreError> {
        // Re-read: a paired delete may be halfway through.
        match self
            .edges
            .find(&edge.source_id, &edge.target_id, &edge.relationship_type)
            .await?
        {
            Some(current) if current.is_mutual => {}
            _ => return Ok(RepairAction::Vanished),
        }

        if self.policy == RepairPolicy::Downgrade {
            return match self.edges.set_mutual(&edge.id, false).await {
                Ok(_) => Ok(RepairAction::Downgraded),
                Err(StoreError::NotFound(_)) => Ok(RepairAction::Vanished),
                Err(e) => Err(e),
            };
        }

        if let Some(existing) = reciprocal {
            return self.upgrade(&existing).await;
        }

        match self.edges.create(edge.reciprocal()).await {
            Ok(created) => Ok(RepairAction::Recreated {
                reciprocal_id: created.id,
            }),
            Err(StoreError::AlreadyExists { .. }) => {
                match self
                    .edges
                    .find(&edge.target_id, &edge.source_id, &edge.relationship_type)
                    .await?
                {
                    Some(existing) if existing.is_mutual => Ok(RepairAction::AlreadyHealed),
                    Some(existing) => self.upgrade(&existing).await,
                    None => Ok(RepairAction::Failed {
                        error: "reciprocal vanished during repair".into(),
                    }),
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn upgrade(&self, reciprocal: &Edge) -> Result<RepairAction, StoreError> {
        let updated = self.edges.set_mutual(&reciprocal.id, true).await?;
        Ok(RepairAction::UpgradedReciprocal {
            reciprocal_id: updated.id,
        })
    }
}
