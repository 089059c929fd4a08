//! MCP `repair_relationships` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `repair_relationships` MCP tool.
///
/// Omit `contact_id` to scan the whole store.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RepairRelationshipsParams {
    #[schemars(description = "Limit the scan to edges touching this contact. Omit to scan everything.")]
    pub contact_id: Option<String>,

    #[schemars(description = "Report dangling mutual edges without fixing them (default: false)")]
    pub dry_run: Option<bool>,
}
