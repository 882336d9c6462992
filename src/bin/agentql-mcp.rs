//! AgentQL MCP Server: web data extraction and remote browser sessions.
//!
//! Usage: agentql-mcp  (stdio transport; requires AGENTQL_API_KEY, optional AGENTQL_API_HOST)

use agentql_mcp_lib::config::AppConfig;
use agentql_mcp_lib::AgentQlMcpServer;
use rmcp::ServiceExt;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("SIGTERM handler unavailable: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!("AgentQL API host: {}", config.api_host);

    let server = AgentQlMcpServer::from_config(&config)?;
    let registry = Arc::clone(server.registry());

    let transport = tokio::io::join(tokio::io::stdin(), tokio::io::stdout());
    let service = server.serve(transport).await?;
    tracing::info!("Server started (stdio transport)");

    tokio::select! {
        quit = service.waiting() => {
            let reason = quit?;
            tracing::info!("Transport closed ({:?}), closing all sessions", reason);
            registry.close_all().await;
        }
        _ = shutdown_signal() => {
            tracing::info!("Shutting down, closing all sessions...");
            registry.close_all().await;
            // stdin may still be blocked in a read; don't wait for it
            std::process::exit(0);
        }
    }
    Ok(())
}
