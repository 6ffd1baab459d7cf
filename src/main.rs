use std::sync::Arc;

use mimalloc::MiMalloc;
use tokio::signal;
use tracing::{error, info, warn};

use duraq::config::Config;
use duraq::http::{self, AppState};
use duraq::queue::sqlite::SqliteConfig;
use duraq::queue::JobQueue;
use duraq::telemetry;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                warn!(error = %e, "Failed to install Ctrl+C handler, continuing without it");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler, continuing without it");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    let queue = JobQueue::open(SqliteConfig::from_env())?;

    let state = AppState {
        queue,
        config: Arc::new(config.clone()),
    };
    let router = http::create_router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.port,
        environment = %config.environment,
        "duraq API ready"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}
