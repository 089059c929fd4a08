//! MCP `list_relationships` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `list_relationships` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListRelationshipsParams {
    /// Contact whose relationships to list, in either direction.
    #[schemars(description = "ID of the contact whose relationships to list")]
    pub contact_id: String,

    #[schemars(description = "Owner the contacts belong to. Defaults to the configured owner.")]
    pub owner: Option<String>,
}
