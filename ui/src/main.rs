mod api;
mod log_buffer;

use api::AppState;
use log_buffer::RollingLog;
use quorum_fs::client::agent::CacheAgent;
use quorum_fs::cluster::config::ClusterConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let bind_addr: SocketAddr = std::env::var("UI_BIND")
        .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
        .parse()?;
    let client_host = std::env::var("CLIENT_HOST").unwrap_or_else(|_| "localhost".to_string());
    let client_port: u16 = std::env::var("CLIENT_PORT")
        .unwrap_or_else(|_| "9000".to_string())
        .parse()?;
    let config_path = std::env::var_os("QFS_CONFIG").map(std::path::PathBuf::from);
    let config = Arc::new(ClusterConfig::load_or_default(config_path.as_deref())?);

    let agent = CacheAgent::open(
        client_host,
        client_port,
        config,
        CacheAgent::default_cache_dir(client_port),
    )
    .await?;
    let log = Arc::new(RollingLog::default());

    // Subscribe before the listener starts so no invalidation goes unlogged.
    let mut invalidations = agent.subscribe_invalidations();
    let invalidation_log = log.clone();
    tokio::spawn(async move {
        loop {
            match invalidations.recv().await {
                Ok(filename) => invalidation_log.push(format!("Cache Invalidated: {}", filename)),
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!("Missed {} invalidation log entries", missed)
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    agent.clone().start().await?;
    log.push("Web Client Started");

    let state = AppState { agent, log };
    let app = api::router(state);

    tracing::info!("UI listening on {}", bind_addr);
    axum::serve(tokio::net::TcpListener::bind(bind_addr).await?, app).await?;

    Ok(())
}
