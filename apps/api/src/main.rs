//! # FitnessWise API Server
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          API Server                                     │
//! │                                                                         │
//! │  Tracker / PWA ───► HTTP (5000) ───► Routes ───► MemStorage            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use fitnesswise_api::{run, ApiConfig, AppState};

const DEFAULT_LOG_FILTER: &str = "info,fitnesswise=debug,tower_http=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting FitnessWise API server...");

    let config = ApiConfig::load()?;
    let addr = config.socket_addr()?;
    info!(%addr, "Configuration loaded");

    let listener = TcpListener::bind(addr).await?;
    run(listener, AppState::default(), shutdown_signal()).await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Graceful shutdown signal handler.
///
/// If a handler can't be installed that branch never fires; the other one
/// still can.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
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
