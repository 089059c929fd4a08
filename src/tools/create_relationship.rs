//! MCP `create_relationship` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `create_relationship` MCP tool.
///
/// Creates the directed edge source → target, plus its reciprocal when
/// `mutual` is set.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CreateRelationshipParams {
    /// ID of the source contact.
    #[schemars(description = "ID of the source contact")]
    pub source_id: String,

    /// ID of the target contact.
    #[schemars(description = "ID of the target contact")]
    pub target_id: String,

    /// Relationship label (e.g. `"friend"`, `"sibling"`, `"coworker"`).
    #[schemars(description = "Relationship type (e.g. 'friend', 'sibling', 'coworker')")]
    pub r#type: String,

    /// Whether the relationship holds both ways. Defaults to `false`.
    #[schemars(description = "If true, also create the reverse edge so both contacts list it. Defaults to false.")]
    pub mutual: Option<bool>,

    /// Acting owner. Defaults to the configured owner.
    #[schemars(description = "Owner the contacts belong to. Defaults to the configured owner.")]
    pub owner: Option<String>,
}
