//! CLI `doctor` command: run database diagnostics and print a health report.

use anyhow::{Context, Result};

use kith::config::KithConfig;
use kith::db;

/// Run database diagnostics and print a health report.
pub fn doctor(config: &KithConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !db_path.exists() {
        println!("Database: not found at {}", db_path.display());
        println!("Run `kith serve` or `kith import` to initialize.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    let conn = db::open_database(&db_path).context("failed to open database (may be corrupt)")?;

    let report = db::check_database_health(&conn).context("failed to run health check")?;

    println!("kith Health Report");
    println!("==================");
    println!();
    println!("Database:          {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Schema version:    {}", report.schema_version);
    println!();
    println!("Row counts:");
    println!("  Contacts:        {}", report.contact_count);
    println!("  Edges:           {}", report.edge_count);
    println!("  Mutual edges:    {}", report.mutual_edge_count);
    println!();
    if report.dangling_mutual_count == 0 {
        println!("Mutual pairs:      OK");
    } else {
        println!(
            "Mutual pairs:      {} edges missing their reverse edge",
            report.dangling_mutual_count
        );
        println!("  Run `kith repair` to heal them.");
    }
    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED ({})", report.integrity_details);
        println!();
        println!("Recovery steps:");
        println!("  1. Restore from a backup: cp backup.db ~/.kith/graph.db");
        println!("  2. Or export from a good copy and reimport:");
        println!("     kith export > backup.json");
        println!("     kith import backup.json");
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_bytes_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
