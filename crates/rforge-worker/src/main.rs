//! Render worker binary.

use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rforge_worker::{Executor, WorkerConfig, WorkerContext};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(EnvFilter::from_default_env().add_directive("rforge=info".parse().unwrap()))
        .init();

    info!("starting rforge-worker");

    let config = WorkerConfig::from_env()?;
    info!(?config, "worker config");

    let ctx = Arc::new(WorkerContext::new(config).await?);
    let executor = Arc::new(Executor::new(ctx));

    // Ctrl-C flips the shutdown flag; the loop drains after the current job.
    let signal_executor = Arc::clone(&executor);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received shutdown signal");
            signal_executor.shutdown();
        }
    });

    if let Err(e) = executor.run().await {
        error!(error = %e, "executor error");
        std::process::exit(1);
    }

    info!("worker shutdown complete");
    Ok(())
}
