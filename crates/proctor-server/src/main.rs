//! proctor-server: WebSocket front end of the interview-session coordinator.

mod bootstrap;
mod http;
mod logging;
mod ws;

use anyhow::{Context, Result};
use proctor_infrastructure::ConfigService;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = logging::init();

    let config = ConfigService::new()
        .load()
        .context("Failed to load configuration")?;
    let router = bootstrap::build(&config).await?;
    let app = http::build_router(router);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("[Server] Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("[Server] Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("[Server] Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("[Server] Shutdown requested");
}
