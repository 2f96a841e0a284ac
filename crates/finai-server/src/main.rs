//! finai HTTP server

use anyhow::Context;
use finai_analysis::AppConfig;
use finai_server::{AppState, router};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    finai_utils::init_tracing();

    let config = Arc::new(AppConfig::from_env().context("invalid configuration")?);
    info!(
        provider = ?config.generation.provider,
        model = %config.generation.model,
        data_dir = %config.data_dir.display(),
        static_dir = %config.static_dir.display(),
        "configuration loaded"
    );

    let app = router(AppState::from_config(config.clone()));
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "finai server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("finai server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
