pub mod create_relationship;
pub mod delete_relationship;
pub mod list_relationships;
pub mod repair_relationships;

use create_relationship::CreateRelationshipParams;
use delete_relationship::DeleteRelationshipParams;
use list_relationships::ListRelationshipsParams;
use repair_relationships::RepairRelationshipsParams;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use std::sync::Arc;

use kith::config::KithConfig;
use kith::graph::error::RelationshipError;
use kith::graph::manager::RelationshipManager;
use kith::graph::repair::{ConsistencyRepair, RepairScope};
use kith::graph::types::Identity;

/// The kith MCP tool handler. Holds the relationship manager, the repair
/// service and config, and exposes all MCP tools via the `#[tool_router]` macro.
#[derive(Clone)]
pub struct KithTools {
    tool_router: ToolRouter<Self>,
    manager: Arc<RelationshipManager>,
    repair: Arc<ConsistencyRepair>,
    config: Arc<KithConfig>,
}

#[tool_router]
impl KithTools {
    pub fn new(
        manager: Arc<RelationshipManager>,
        repair: Arc<ConsistencyRepair>,
        config: Arc<KithConfig>,
    ) -> Self {
        Self {
            tool_router: Self::tool_router(),
            manager,
            repair,
            config,
        }
    }

    fn identity(&self, owner: Option<String>) -> Identity {
        Identity::new(owner.unwrap_or_else(|| self.config.storage.default_owner.clone()))
    }

    /// Relate two contacts.
    #[tool(description = "Create a relationship between two contacts. With mutual=true both contacts list it; a 'partial' status means only one direction was written and repair will finish it.")]
    async fn create_relationship(
        &self,
        Parameters(params): Parameters<CreateRelationshipParams>,
    ) -> Result<String, String> {
        let identity = self.identity(params.owner);
        let mutual = params.mutual.unwrap_or(false);

        tracing::info!(
            source = %params.source_id,
            target = %params.target_id,
            relationship_type = %params.r#type,
            mutual,
            "create_relationship called"
        );

        let result = self
            .manager
            .create_relationship(
                &identity,
                &params.source_id,
                &params.target_id,
                &params.r#type,
                mutual,
            )
            .await;

        match result {
            Ok(relationship) => Ok(serde_json::json!({
                "status": "created",
                "relationship": relationship,
            })
            .to_string()),
            Err(err @ RelationshipError::PartialWrite { .. }) => Ok(partial_response(&err)),
            Err(e) => Err(format!("create failed: {e}")),
        }
    }

    /// Remove a relationship and, if mutual, its reverse edge.
    #[tool(description = "Delete a relationship between two contacts. Mutual relationships are removed in both directions.")]
    async fn delete_relationship(
        &self,
        Parameters(params): Parameters<DeleteRelationshipParams>,
    ) -> Result<String, String> {
        let identity = self.identity(params.owner);

        tracing::info!(
            source = %params.source_id,
            target = %params.target_id,
            relationship_type = %params.r#type,
            "delete_relationship called"
        );

        let result = self
            .manager
            .delete_relationship(&identity, &params.source_id, &params.target_id, &params.r#type)
            .await;

        match result {
            Ok(()) => Ok(serde_json::json!({ "status": "deleted" }).to_string()),
            Err(err @ RelationshipError::PartialWrite { .. }) => Ok(partial_response(&err)),
            Err(e) => Err(format!("delete failed: {e}")),
        }
    }

    /// List a contact's relationships, one entry per pair.
    #[tool(description = "List all relationships of a contact. Each relationship appears once, with its direction relative to the contact and the other contact's details.")]
    async fn list_relationships(
        &self,
        Parameters(params): Parameters<ListRelationshipsParams>,
    ) -> Result<String, String> {
        let identity = self.identity(params.owner);
        tracing::debug!(contact = %params.contact_id, "list_relationships called");

        let relationships = self
            .manager
            .list_relationships_for_contact(&identity, &params.contact_id)
            .await
            .map_err(|e| format!("list failed: {e}"))?;

        serde_json::to_string(&serde_json::json!({
            "contact_id": params.contact_id,
            "total": relationships.len(),
            "relationships": relationships,
        }))
        .map_err(|e| format!("serialization failed: {e}"))
    }

    /// Find and heal one-sided mutual relationships.
    #[tool(description = "Scan for mutual relationships that are missing their reverse edge and heal them. Use dry_run=true to only report.")]
    async fn repair_relationships(
        &self,
        Parameters(params): Parameters<RepairRelationshipsParams>,
    ) -> Result<String, String> {
        let scope = match params.contact_id {
            Some(id) if !id.trim().is_empty() => RepairScope::Contact(id.trim().to_string()),
            _ => RepairScope::All,
        };
        let dry_run = params.dry_run.unwrap_or(false);

        tracing::info!(%scope, dry_run, "repair_relationships called");

        let report = if dry_run {
            self.repair.detect(&scope).await
        } else {
            self.repair.scan(&scope).await
        }
        .map_err(|e| format!("repair failed: {e}"))?;

        serde_json::to_string(&report).map_err(|e| format!("serialization failed: {e}"))
    }
}

/// A partial write is a warning, not a failure: the first edge is stored.
fn partial_response(err: &RelationshipError) -> String {
    let relationship = match err {
        RelationshipError::PartialWrite { relationship, .. } => Some(relationship),
        _ => None,
    };
    serde_json::json!({
        "status": "partial",
        "warning": err.to_string(),
        "relationship": relationship,
    })
    .to_string()
}

#[tool_handler]
impl ServerHandler for KithTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "kith manages relationships between contacts. Use create_relationship and \
                 delete_relationship to change them, list_relationships to view a contact's \
                 relationships, and repair_relationships to heal one-sided mutual pairs."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
