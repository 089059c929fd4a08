//! CLI `repair` command: find and heal one-sided mutual relationships.

use anyhow::{Context, Result};

use kith::config::KithConfig;
use kith::graph::repair::{RepairAction, RepairScope};

pub async fn repair(
    config: &KithConfig,
    contact: Option<&str>,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let (_, repair) = super::open_services(config)?;

    let scope = match contact {
        Some(id) => RepairScope::Contact(id.to_string()),
        None => RepairScope::All,
    };

    let report = if dry_run {
        repair.detect(&scope).await
    } else {
        repair.scan(&scope).await
    }
    .context("repair scan failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", report.summary());
    for finding in &report.findings {
        let edge = &finding.edge;
        let outcome = match &finding.action {
            RepairAction::Recreated { reciprocal_id } => format!("recreated reverse edge {reciprocal_id}"),
            RepairAction::UpgradedReciprocal { reciprocal_id } => {
                format!("marked reverse edge {reciprocal_id} mutual")
            }
            RepairAction::Downgraded => "downgraded to one-directional".to_string(),
            RepairAction::AlreadyHealed => "already healed".to_string(),
            RepairAction::Vanished => "deleted before repair".to_string(),
            RepairAction::Detected => "missing reverse edge".to_string(),
            RepairAction::Failed { error } => format!("FAILED: {error}"),
        };
        println!(
            "  {} -> {} ({}): {outcome}",
            edge.source_id, edge.target_id, edge.relationship_type
        );
    }

    if report.failed() > 0 {
        anyhow::bail!("{} edges could not be repaired; run again later", report.failed());
    }

    Ok(())
}
