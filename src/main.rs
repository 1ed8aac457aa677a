//! barrage service
//!
//! Accepts load test scenarios over HTTP, runs them, and streams progress.
//! See [`barrage::config`] for the environment variables it reads.

use std::sync::Arc;

use anyhow::Context;
use barrage::{
    ProgressBroadcaster,
    client::ReqwestClient,
    config::ServerConfig,
    server::{AppState, router},
};
use tokio::{net::TcpListener, signal};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = ServerConfig::from_env()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_threads)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    runtime.block_on(async_main(config))
}

async fn async_main(config: ServerConfig) -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "barrage=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("failed to create {}", config.upload_dir.display()))?;

    let client =
        ReqwestClient::new(config.request_timeout).context("failed to build HTTP client")?;
    let progress = ProgressBroadcaster::new(config.progress_capacity);
    let state = AppState::new(Arc::new(client), progress.clone(), config.upload_dir.clone())
        .with_upload_max_bytes(config.upload_max_bytes);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(
        "Listening on {addr} ({} worker threads, uploads in {})",
        config.worker_threads,
        config.upload_dir.display()
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal(progress))
        .await
        .context("server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C and closes every progress stream so open
/// connections can finish.
async fn shutdown_signal(progress: ProgressBroadcaster) {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received Ctrl+C, shutting down...");
    progress.close_all();
}
