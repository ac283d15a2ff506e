//! # FitnessWise API
//!
//! REST server the tracker replicates sessions to and reports completed
//! workouts to.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           API Server                                    │
//! │                                                                         │
//! │  PWA / tracker ──► HTTP (5000) ──► TraceLayer ──► CorsLayer            │
//! │                                                  │                      │
//! │                         ┌────────────────────────┼─────────────────┐    │
//! │                         ▼            ▼           ▼          ▼      │    │
//! │                      /users     /workouts   /exercises  /sessions  │    │
//! │                         └────────────┴─────┬─────┴──────────┘      │    │
//! │                                            ▼                       │    │
//! │                                       MemStorage                   │    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables:
//! - `BIND_ADDR` - Interface to listen on (default: 0.0.0.0)
//! - `PORT` - HTTP port (default: 5000)
//! - `RUST_LOG` - Log filter (default: `info,fitnesswise=debug,tower_http=debug`)

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod storage;

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

// Re-exports
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use storage::{MemStorage, StorageError};

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub storage: Arc<MemStorage>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(storage: MemStorage) -> Self {
        AppState {
            storage: Arc::new(storage),
            started_at: Utc::now(),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        AppState::new(MemStorage::new())
    }
}

/// Builds the full router with all routes nested under `/api`.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/users", routes::users::router())
        .nest("/workouts", routes::workouts::router())
        .nest("/exercises", routes::exercises::router())
        .nest("/sessions", routes::sessions::router())
        .nest("/health", routes::health::router());

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves the API on `listener` until `shutdown` resolves.
pub async fn run(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, "API listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("API stopped");
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
