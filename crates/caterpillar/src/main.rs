//! caterpillar: answers `GET /test` with `400 Caterpillar drive offline.`
//!
//! Listens on [::]:8000 (IPv4 and IPv6) until interrupted. Bind failures
//! exit non-zero.

use anyhow::Context;
use caterpillar_core::{handlers, Server, ServerConfig};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn init_telemetry() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_thread_ids(false))
        .init();
}

fn main() -> anyhow::Result<()> {
    init_telemetry();

    let config = ServerConfig::default();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.workers.max(1))
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;

    runtime.block_on(run(config))
}

async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let routes = handlers::routes()?;
    let server = Server::bind(&config, routes).inspect_err(|e| {
        tracing::error!(error = %e, "cannot start responder");
    })?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        routes = server.state().routes.len(),
        workers = config.workers,
        "caterpillar starting"
    );

    server.serve(shutdown_signal()).await?;
    info!("caterpillar stopped");
    Ok(())
}

/// Resolves on Ctrl-C. If the handler cannot be installed the server runs
/// until killed.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "ctrl-c handler unavailable");
        std::future::pending::<()>().await;
    }
}
