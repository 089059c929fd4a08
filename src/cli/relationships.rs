//! CLI `link`, `unlink` and `list` commands.

use anyhow::{Context, Result};

use kith::config::KithConfig;
use kith::graph::error::RelationshipError;
use kith::graph::types::{Direction, Identity};

fn identity(config: &KithConfig, owner: Option<&str>) -> Identity {
    Identity::new(owner.unwrap_or(&config.storage.default_owner))
}

/// Create a relationship between two contacts.
pub async fn link(
    config: &KithConfig,
    source: &str,
    target: &str,
    relationship_type: &str,
    mutual: bool,
    owner: Option<&str>,
) -> Result<()> {
    let (manager, _) = super::open_services(config)?;
    let identity = identity(config, owner);

    match manager
        .create_relationship(&identity, source, target, relationship_type, mutual)
        .await
    {
        Ok(relationship) => {
            let arrow = if relationship.is_mutual { "<->" } else { "->" };
            println!("Linked {source} {arrow} {target} ({})", relationship.relationship_type);
            Ok(())
        }
        Err(e @ RelationshipError::PartialWrite { .. }) => {
            println!("Linked {source} -> {target}, but the reverse edge was not written.");
            println!("  {e}");
            println!("Run `kith repair --contact {source}` to finish the pair.");
            Ok(())
        }
        Err(e) => Err(e).context("failed to link contacts"),
    }
}

/// Delete a relationship, and its reverse edge if it was mutual.
pub async fn unlink(
    config: &KithConfig,
    source: &str,
    target: &str,
    relationship_type: &str,
    owner: Option<&str>,
) -> Result<()> {
    let (manager, _) = super::open_services(config)?;
    let identity = identity(config, owner);

    match manager
        .delete_relationship(&identity, source, target, relationship_type)
        .await
    {
        Ok(()) => {
            println!("Unlinked {source} -> {target} ({relationship_type})");
            Ok(())
        }
        Err(e @ RelationshipError::PartialWrite { .. }) => {
            println!("Unlinked {source} -> {target}, but the reverse edge is still stored.");
            println!("  {e}");
            println!("Run `kith unlink {target} {source} {relationship_type}` to remove it.");
            Ok(())
        }
        Err(e) => Err(e).context("failed to unlink contacts"),
    }
}

/// Print every relationship of a contact, once per pair.
pub async fn list(config: &KithConfig, contact: &str, owner: Option<&str>, json: bool) -> Result<()> {
    let (manager, _) = super::open_services(config)?;
    let identity = identity(config, owner);

    let relationships = manager
        .list_relationships_for_contact(&identity, contact)
        .await
        .context("failed to list relationships")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&relationships)?);
        return Ok(());
    }

    if relationships.is_empty() {
        println!("No relationships for {contact}.");
        return Ok(());
    }

    println!("Relationships of {contact}");
    println!("{}", "=".repeat(40));
    for rel in &relationships {
        let arrow = match (rel.relationship.is_mutual, rel.direction) {
            (true, _) => "<->",
            (false, Direction::Outgoing) => "->",
            (false, Direction::Incoming) => "<-",
        };
        let name = rel
            .other
            .as_ref()
            .map(|c| c.name.as_str())
            .unwrap_or("(unknown contact)");
        println!(
            "  {:<12} {arrow:<3} {} [{}]",
            rel.relationship.relationship_type, name, rel.other_id
        );
    }
    println!();
    println!("{} relationships", relationships.len());

    Ok(())
}
