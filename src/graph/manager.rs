//! Paired edge writes and deduplicated reads.
//!
//! [`RelationshipManager`] presents one undirected relationship on top of two
//! independently written edges. The primary edge is always written first and
//! is never rolled back: if the reciprocal write fails after bounded retries,
//! the caller gets [`RelationshipError::PartialWrite`] and the contact is
//! queued for [`ConsistencyRepair`](super::repair::ConsistencyRepair).

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::contacts::ContactLookup;
use super::edge_store::EdgeStore;
use super::error::{PairedOperation, RelationshipError, StoreError};
use super::types::{ContactRelationship, Direction, Edge, Identity, LogicalRelationship};
use super::worker::RepairHint;
use crate::config::RelationshipConfig;

/// Bounded retry for the second write of a pair.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub attempts: u32,
    /// Sleep before the second attempt; doubles each time.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RelationshipConfig::default())
    }
}

impl From<&RelationshipConfig> for RetryPolicy {
    fn from(config: &RelationshipConfig) -> Self {
        Self {
            attempts: config.retry_attempts.max(1),
            backoff: config.retry_backoff(),
        }
    }
}

/// Run `op` until it succeeds, fails with a non-transient error, or runs out
/// of attempts.
async fn retry_transient<T, F, Fut>(policy: RetryPolicy, what: &str, mut op: F) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut attempt = 1;
    let mut backoff = policy.backoff;
    loop {
        match op().await {
            Err(e) if e.is_transient() && attempt < policy.attempts => {
                warn!(attempt, max = policy.attempts, error = %e, "{what} failed, retrying");
                tokio::time::sleep(backoff).await;
                backoff = backoff.saturating_mul(2);
                attempt += 1;
            }
            other => return other,
        }
    }
}

/// Trim and check the (source, target, type) triple.
fn normalize(
    source_id: &str,
    target_id: &str,
    relationship_type: &str,
) -> Result<(String, String, String), RelationshipError> {
    let (source_id, target_id, relationship_type) =
        (source_id.trim(), target_id.trim(), relationship_type.trim());

    if source_id.is_empty() || target_id.is_empty() {
        return Err(RelationshipError::Validation("contact ids must not be empty".into()));
    }
    if relationship_type.is_empty() {
        return Err(RelationshipError::Validation("relationship type must not be empty".into()));
    }
    if source_id == target_id {
        return Err(RelationshipError::Validation(format!(
            "a contact cannot be related to itself: {source_id}"
        )));
    }

    Ok((
        source_id.to_string(),
        target_id.to_string(),
        relationship_type.to_string(),
    ))
}

/// Keep the first edge seen per canonical pair key, preserving input order.
///
/// Callers pass outgoing edges before incoming ones, so for a mutual pair the
/// outgoing half wins.
pub fn dedupe_by_pair_key(edges: impl IntoIterator<Item = Edge>) -> Vec<Edge> {
    let mut seen = HashSet::new();
    edges
        .into_iter()
        .filter(|edge| seen.insert(edge.pair_key()))
        .collect()
}

pub struct RelationshipManager {
    edges: Arc<dyn EdgeStore>,
    contacts: Arc<dyn ContactLookup>,
    retry: RetryPolicy,
    hints: Option<mpsc::UnboundedSender<RepairHint>>,
}

impl RelationshipManager {
    pub fn new(edges: Arc<dyn EdgeStore>, contacts: Arc<dyn ContactLookup>) -> Self {
        Self {
            edges,
            contacts,
            retry: RetryPolicy::default(),
            hints: None,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Queue contacts touched by partial writes for prompt repair.
    pub fn with_repair_hints(mut self, hints: mpsc::UnboundedSender<RepairHint>) -> Self {
        self.hints = Some(hints);
        self
    }

    /// Create a relationship; with `mutual`, also its reciprocal edge.
    ///
    /// Returns `Conflict` if a relationship with the same pair key already
    /// exists, `NotFound` if either contact is unknown to `identity`, and
    /// `PartialWrite` if the primary edge landed but the reciprocal could not
    /// be written. A mutual request over an existing one-way reverse edge
    /// marks that edge mutual instead of writing a new one.
    pub async fn create_relationship(
        &self,
        identity: &Identity,
        source_id: &str,
        target_id: &str,
        relationship_type: &str,
        mutual: bool,
    ) -> Result<LogicalRelationship, RelationshipError> {
        let (source_id, target_id, relationship_type) =
            normalize(source_id, target_id, relationship_type)?;

        self.require_contact(identity, &source_id).await?;
        self.require_contact(identity, &target_id).await?;

        let conflict = || {
            RelationshipError::Conflict(format!("{source_id} -> {target_id} ({relationship_type})"))
        };

        // Best effort only; the store's unique constraint is the real guard.
        if self
            .edges
            .find(&source_id, &target_id, &relationship_type)
            .await?
            .is_some()
        {
            return Err(conflict());
        }

        // One logical relationship per pair key. A one-way reverse edge can
        // only be joined into a mutual pair.
        let reverse = match self
            .edges
            .find(&target_id, &source_id, &relationship_type)
            .await?
        {
            Some(reverse) if reverse.is_mutual || !mutual => return Err(conflict()),
            reverse => reverse,
        };

        let primary = match self
            .edges
            .create(Edge::new(&source_id, &target_id, &relationship_type, mutual))
            .await
        {
            Ok(edge) => edge,
            Err(StoreError::AlreadyExists { .. }) => return Err(conflict()),
            Err(e) => return Err(e.into()),
        };

        info!(
            owner = %identity,
            source = %source_id,
            target = %target_id,
            relationship_type = %relationship_type,
            mutual,
            "relationship created"
        );

        let relationship = LogicalRelationship::from(&primary);
        if !mutual {
            return Ok(relationship);
        }

        let edges = &self.edges;
        if let Some(reverse) = reverse {
            let reverse_id = &reverse.id;
            let outcome = retry_transient(self.retry, "reciprocal upgrade", move || {
                edges.set_mutual(reverse_id, true)
            })
            .await;
            return match outcome {
                Ok(_) => {
                    debug!(edge = %reverse.id, "one-way reverse edge joined into mutual pair");
                    Ok(relationship)
                }
                Err(e) => Err(self.partial_write(PairedOperation::Create, relationship, e)),
            };
        }

        let reciprocal = &primary.reciprocal();
        let outcome = retry_transient(self.retry, "reciprocal create", move || {
            edges.create(reciprocal.clone())
        })
        .await;

        match outcome {
            Ok(_) => Ok(relationship),
            Err(err @ StoreError::AlreadyExists { .. }) => {
                // A concurrent writer got there first; fine if it is the mutual half.
                match self
                    .edges
                    .find(&target_id, &source_id, &relationship_type)
                    .await
                {
                    Ok(Some(existing)) if existing.is_mutual => Ok(relationship),
                    Ok(_) => Err(self.partial_write(PairedOperation::Create, relationship, err)),
                    Err(e) => Err(self.partial_write(PairedOperation::Create, relationship, e)),
                }
            }
            Err(e) => Err(self.partial_write(PairedOperation::Create, relationship, e)),
        }
    }

    /// Delete the edge (source → target, type) and, if it was mutual, its
    /// reciprocal. A reciprocal that is already gone is not an error.
    pub async fn delete_relationship(
        &self,
        identity: &Identity,
        source_id: &str,
        target_id: &str,
        relationship_type: &str,
    ) -> Result<(), RelationshipError> {
        let (source_id, target_id, relationship_type) =
            normalize(source_id, target_id, relationship_type)?;

        let edge = self
            .edges
            .find(&source_id, &target_id, &relationship_type)
            .await?
            .ok_or_else(|| {
                RelationshipError::NotFound(format!(
                    "relationship {source_id} -> {target_id} ({relationship_type})"
                ))
            })?;

        match self.edges.delete(&edge.id).await {
            // Lost a race with another delete; the edge is gone either way.
            Ok(()) | Err(StoreError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        info!(
            owner = %identity,
            source = %source_id,
            target = %target_id,
            relationship_type = %relationship_type,
            mutual = edge.is_mutual,
            "relationship deleted"
        );

        if !edge.is_mutual {
            return Ok(());
        }

        let this = self;
        let primary = &edge;
        let outcome = retry_transient(self.retry, "reciprocal delete", move || {
            this.delete_reciprocal(primary)
        })
        .await;

        match outcome {
            Ok(true) => Ok(()),
            Ok(false) => {
                debug!(edge = %edge.id, "mutual edge had no reciprocal; pair was already dangling");
                Ok(())
            }
            Err(e) => Err(self.partial_write(
                PairedOperation::Delete,
                LogicalRelationship::from(&edge),
                e,
            )),
        }
    }

    /// Every logical relationship `contact_id` takes part in, one entry per
    /// canonical pair key, with the other contact resolved.
    ///
    /// A mutual edge whose reciprocal is missing is still listed.
    pub async fn list_relationships_for_contact(
        &self,
        identity: &Identity,
        contact_id: &str,
    ) -> Result<Vec<ContactRelationship>, RelationshipError> {
        let contact_id = contact_id.trim();
        if contact_id.is_empty() {
            return Err(RelationshipError::Validation("contact id must not be empty".into()));
        }

        let (forward, reverse) = tokio::try_join!(
            self.edges.find_all_by_source(contact_id),
            self.edges.find_all_by_target(contact_id),
        )?;

        let mut relationships = Vec::new();
        for edge in dedupe_by_pair_key(forward.into_iter().chain(reverse)) {
            let direction = edge
                .direction_for(contact_id)
                .unwrap_or(Direction::Outgoing);
            let other_id = edge.other_end(contact_id).to_string();
            let other = self.contacts.get_contact(identity, &other_id).await?;
            if other.is_none() {
                warn!(contact = %contact_id, other = %other_id, "related contact not found");
            }

            relationships.push(ContactRelationship {
                relationship: LogicalRelationship::from(&edge),
                direction,
                other_id,
                other,
            });
        }

        Ok(relationships)
    }

    async fn require_contact(
        &self,
        identity: &Identity,
        contact_id: &str,
    ) -> Result<(), RelationshipError> {
        match self.contacts.get_contact(identity, contact_id).await? {
            Some(_) => Ok(()),
            None => Err(RelationshipError::NotFound(format!("contact {contact_id}"))),
        }
    }

    /// Returns whether a reciprocal existed.
    async fn delete_reciprocal(&self, edge: &Edge) -> Result<bool, StoreError> {
        let reciprocal = self
            .edges
            .find(&edge.target_id, &edge.source_id, &edge.relationship_type)
            .await?;
        match reciprocal {
            Some(reciprocal) => match self.edges.delete(&reciprocal.id).await {
                Ok(()) | Err(StoreError::NotFound(_)) => Ok(true),
                Err(e) => Err(e),
            },
            None => Ok(false),
        }
    }

    fn partial_write(
        &self,
        operation: PairedOperation,
        relationship: LogicalRelationship,
        cause: StoreError,
    ) -> RelationshipError {
        warn!(
            %operation,
            pair = %relationship.pair_key,
            error = %cause,
            "reciprocal edge write failed; pair left for repair"
        );

        if let Some(hints) = &self.hints {
            let hint = RepairHint {
                contact_id: relationship.contact_a.clone(),
            };
            if hints.send(hint).is_err() {
                debug!("repair worker not running; hint dropped");
            }
        }

        RelationshipError::PartialWrite {
            operation,
            relationship,
            cause,
        }
    }
}
