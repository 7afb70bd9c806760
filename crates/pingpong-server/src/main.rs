#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::Result;
use pingpong_core::{AppCore, ServerConfig};
use pingpong_server::{HttpServer, shutdown_signal};
use std::sync::Arc;
use tokio::sync::broadcast;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pingpong_server=debug".into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();

    tracing::info!("Starting PingPong agent server");

    let config = ServerConfig::load()?;
    let core = Arc::new(AppCore::new(config)?);

    let (shutdown_tx, _) = broadcast::channel(1);
    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = signal_tx.send(());
    });

    HttpServer::new(core).run(shutdown_tx).await?;

    tracing::info!("PingPong agent server stopped");
    Ok(())
}
