mod cli;
mod server;
mod tools;

use anyhow::Result;
use clap::{Parser, Subcommand};
use kith::config;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kith", version, about = "Contact relationship graph with self-healing mutual pairs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the MCP server (transport from config: stdio or http)
    Serve,
    /// Relate two contacts
    Link {
        source: String,
        target: String,
        /// Relationship type, e.g. friend or sibling
        #[arg(value_name = "TYPE")]
        relationship_type: String,
        /// Also create the reverse edge
        #[arg(long)]
        mutual: bool,
        #[arg(long)]
        owner: Option<String>,
    },
    /// Remove a relationship (both directions if mutual)
    Unlink {
        source: String,
        target: String,
        #[arg(value_name = "TYPE")]
        relationship_type: String,
        #[arg(long)]
        owner: Option<String>,
    },
    /// List a contact's relationships
    List {
        contact: String,
        #[arg(long)]
        owner: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Find and heal mutual relationships missing their reverse edge
    Repair {
        /// Only look at edges touching this contact
        #[arg(long)]
        contact: Option<String>,
        /// Report without writing
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        json: bool,
    },
    /// Check database health
    Doctor,
    /// Export contacts and relationships as JSON to stdout
    Export,
    /// Import contacts and relationships from an export file
    Import { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = config::KithConfig::load()?;

    // Log to stderr so stdout stays clean for MCP JSON-RPC and JSON output.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => match config.server.transport.as_str() {
            "http" => server::serve_http(config).await?,
            "stdio" => server::serve_stdio(config).await?,
            other => anyhow::bail!("unknown transport '{other}' (expected stdio or http)"),
        },
        Command::Link {
            source,
            target,
            relationship_type,
            mutual,
            owner,
        } => {
            cli::relationships::link(
                &config,
                &source,
                &target,
                &relationship_type,
                mutual,
                owner.as_deref(),
            )
            .await?;
        }
        Command::Unlink {
            source,
            target,
            relationship_type,
            owner,
        } => {
            cli::relationships::unlink(&config, &source, &target, &relationship_type, owner.as_deref())
                .await?;
        }
        Command::List {
            contact,
            owner,
            json,
        } => {
            cli::relationships::list(&config, &contact, owner.as_deref(), json).await?;
        }
        Command::Repair {
            contact,
            dry_run,
            json,
        } => {
            cli::repair::repair(&config, contact.as_deref(), dry_run, json).await?;
        }
        Command::Doctor => cli::doctor::doctor(&config)?,
        Command::Export => cli::export::export(&config)?,
        Command::Import { file } => cli::import::import(&config, &file)?,
    }

    Ok(())
}
