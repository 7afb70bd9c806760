use anyhow::Result;
use pingpong_core::AppCore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::router;

/// HTTP server plus the background retention sweeper.
pub struct HttpServer {
    core: Arc<AppCore>,
}

impl HttpServer {
    pub fn new(core: Arc<AppCore>) -> Self {
        Self { core }
    }

    /// Serve until `shutdown` fires, then stop the sweeper.
    pub async fn run(&self, shutdown: broadcast::Sender<()>) -> Result<()> {
        let retention = &self.core.config.retention;
        let sweeper = self.core.sweeper.clone().spawn(
            Duration::from_secs(retention.sweep_interval_secs.max(1)),
            retention.sweep_on_startup,
            shutdown.subscribe(),
        );

        let app = router::build_router(self.core.clone());
        let addr = self.core.config.bind_addr();
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!("PingPong agent listening on {}", addr);

        let mut server_shutdown = shutdown.subscribe();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.recv().await;
                info!("HTTP server shutting down");
            })
            .await?;

        // Covers the server exiting on its own.
        let _ = shutdown.send(());
        if let Err(e) = sweeper.await {
            warn!(error = %e, "Retention sweeper task ended abnormally");
        }

        Ok(())
    }
}

/// Resolve on Ctrl-C or SIGTERM.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = tokio::signal::ctrl_c() => {}
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
