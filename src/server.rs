//! MCP server initialization for stdio and HTTP transports.
//!
//! Provides [`serve_stdio`] and [`serve_http`] entry points that wire up the
//! database, relationship services, the optional repair worker, and the MCP
//! tool handler into a running server.

use crate::tools::KithTools;
use anyhow::Result;
use kith::config::KithConfig;
use kith::db;
use kith::graph;
use kith::graph::manager::RelationshipManager;
use kith::graph::repair::ConsistencyRepair;
use kith::graph::worker::RepairWorker;
use rmcp::ServiceExt;
use std::sync::{Arc, Mutex};

/// Shared setup: open DB, build the manager and repair services, and start
/// the background repair worker when enabled.
fn setup_shared_state(
    config: KithConfig,
) -> Result<(
    Arc<RelationshipManager>,
    Arc<ConsistencyRepair>,
    Arc<KithConfig>,
)> {
    let db_path = config.resolved_db_path();
    let conn = db::open_database(&db_path)?;
    tracing::info!(db = %db_path.display(), "database ready");

    let db = Arc::new(Mutex::new(conn));
    let (mut manager, repair) = graph::sqlite_services(db, &config);

    if config.repair.enabled {
        let (worker, hints) = RepairWorker::new(repair.clone(), config.repair.interval());
        manager = manager.with_repair_hints(hints);
        tokio::spawn(worker.run(async {
            let _ = tokio::signal::ctrl_c().await;
        }));
    } else {
        tracing::debug!("background repair disabled");
    }

    Ok((Arc::new(manager), Arc::new(repair), Arc::new(config)))
}

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: KithConfig) -> Result<()> {
    tracing::info!("starting kith MCP server on stdio");

    let (manager, repair, config) = setup_shared_state(config)?;

    let tools = KithTools::new(manager, repair, config);
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running, waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");

    Ok(())
}

/// Start the MCP server over Streamable HTTP transport.
pub async fn serve_http(config: KithConfig) -> Result<()> {
    let host = config.server.host.clone();
    let port = config.server.port;
    let bind_addr = format!("{host}:{port}");

    tracing::info!(addr = %bind_addr, "starting kith MCP server on HTTP");

    let (manager, repair, config) = setup_shared_state(config)?;

    let service = rmcp::transport::streamable_http_server::StreamableHttpService::new(
        move || Ok(KithTools::new(manager.clone(), repair.clone(), config.clone())),
        rmcp::transport::streamable_http_server::session::local::LocalSessionManager::default()
            .into(),
        Default::default(),
    );

    let router = axum::Router::new().nest_service("/mcp", service);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "MCP server listening at http://{bind_addr}/mcp");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            tracing::info!("shutting down HTTP server");
        })
        .await?;

    Ok(())
}
