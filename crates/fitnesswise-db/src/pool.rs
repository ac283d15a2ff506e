//! # Database Pool
//!
//! Connection pool for the local SQLite file. Migrations run on every open.
//!
//! ## Why WAL?
//! The session store writes on every intent while the auto-saver reads the
//! history count and slot timestamps. WAL lets those reads proceed without
//! waiting on the writer.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::history::HistoryRepository;
use crate::repository::slots::SlotRepository;

// =============================================================================
// Configuration
// =============================================================================

/// Where the local database lives and how many connections it gets.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file, or `:memory:`.
    pub database_path: PathBuf,

    /// One writer plus a few readers.
    pub max_connections: u32,

    /// How long a query waits for a free connection.
    pub acquire_timeout: Duration,
}

impl DbConfig {
    /// Creates a configuration for a database file (created if missing).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 4,
            acquire_timeout: Duration::from_secs(30),
        }
    }

    /// An isolated in-memory database, for tests.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            // Every connection to :memory: is its own database
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access.
///
/// Cheap to clone; all clones share one pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool (WAL journal, NORMAL synchronous) and applies pending
    /// migrations.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Opening local database"
        );

        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(1)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        debug!(max_connections = config.max_connections, "Database pool created");

        migrations::run_migrations(&pool).await?;
        Ok(Database { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the local slot repository.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let session: Option<WorkoutSession> = db.slots().get(SlotKey::LiveSession).await?;
    /// ```
    pub fn slots(&self) -> SlotRepository {
        SlotRepository::new(self.pool.clone())
    }

    /// Returns the workout history repository.
    pub fn history(&self) -> HistoryRepository {
        HistoryRepository::new(self.pool.clone())
    }

    /// Closes the pool. Repository calls fail afterwards.
    pub async fn close(&self) {
        info!("Closing local database");
        self.pool.close().await;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
