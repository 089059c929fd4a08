//! Core relationship graph types.
//!
//! An [`Edge`] is one directed record. A mutual relationship is two edges that
//! share a [`PairKey`]; consumers only ever see the merged
//! [`LogicalRelationship`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// The acting owner on whose behalf an operation runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub owner_id: String,
}

impl Identity {
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.owner_id)
    }
}

/// A contact as seen by this layer. Everything beyond the id is display data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub created_at: String,
}

/// A directed relationship record, matching the `relationships` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// UUID v7 primary key.
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    /// Relationship label (e.g. `"friend"`, `"sibling"`, `"coworker"`).
    #[serde(rename = "type")]
    pub relationship_type: String,
    /// `true` if this edge is one half of a mutual pair.
    pub is_mutual: bool,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
}

/// Which way an edge points relative to a given contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// The contact is the edge's source.
    Outgoing,
    /// The contact is the edge's target.
    Incoming,
}

impl Edge {
    /// Build a new, not yet persisted edge with a fresh id and timestamp.
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        relationship_type: impl Into<String>,
        is_mutual: bool,
    ) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            source_id: source_id.into(),
            target_id: target_id.into(),
            relationship_type: relationship_type.into(),
            is_mutual,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// The mirrored record that completes a mutual pair.
    pub fn reciprocal(&self) -> Edge {
        Edge::new(&self.target_id, &self.source_id, &self.relationship_type, true)
    }

    pub fn pair_key(&self) -> PairKey {
        PairKey::new(&self.source_id, &self.target_id, &self.relationship_type)
    }

    /// Direction of this edge as seen from `contact_id`, or `None` if the
    /// contact is not an endpoint.
    pub fn direction_for(&self, contact_id: &str) -> Option<Direction> {
        if self.source_id == contact_id {
            Some(Direction::Outgoing)
        } else if self.target_id == contact_id {
            Some(Direction::Incoming)
        } else {
            None
        }
    }

    /// The endpoint that is not `contact_id`.
    pub fn other_end(&self, contact_id: &str) -> &str {
        if self.source_id == contact_id {
            &self.target_id
        } else {
            &self.source_id
        }
    }
}

/// Direction-independent identity of a logical relationship:
/// `{min(a, b), max(a, b), type}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairKey {
    pub low: String,
    pub high: String,
    #[serde(rename = "type")]
    pub relationship_type: String,
}

impl PairKey {
    pub fn new(a: &str, b: &str, relationship_type: &str) -> Self {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        Self {
            low: low.to_string(),
            high: high.to_string(),
            relationship_type: relationship_type.to_string(),
        }
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.low, self.high, self.relationship_type)
    }
}

/// One relationship as consumers see it, however many edges back it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalRelationship {
    pub pair_key: PairKey,
    #[serde(rename = "type")]
    pub relationship_type: String,
    pub is_mutual: bool,
    /// Source of the representative edge.
    pub contact_a: String,
    /// Target of the representative edge.
    pub contact_b: String,
}

impl From<&Edge> for LogicalRelationship {
    fn from(edge: &Edge) -> Self {
        Self {
            pair_key: edge.pair_key(),
            relationship_type: edge.relationship_type.clone(),
            is_mutual: edge.is_mutual,
            contact_a: edge.source_id.clone(),
            contact_b: edge.target_id.clone(),
        }
    }
}

/// A logical relationship resolved from one contact's point of view.
#[derive(Debug, Clone, Serialize)]
pub struct ContactRelationship {
    #[serde(flatten)]
    pub relationship: LogicalRelationship,
    pub direction: Direction,
    /// Id of the contact on the other end.
    pub other_id: String,
    /// The other contact, or `None` if the lookup no longer knows it.
    pub other: Option<Contact>,
}
