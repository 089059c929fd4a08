use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DeleteRelationshipParams {
    #[schemars(description = "ID of the source contact of the edge to delete")]
    pub source_id: String,

    #[schemars(description = "ID of the target contact of the edge to delete")]
    pub target_id: String,

    #[schemars(description = "Relationship type of the edge to delete")]
    pub r#type: String,

    #[schemars(description = "Owner the contacts belong to. Defaults to the configured owner.")]
    pub owner: Option<String>,
}
