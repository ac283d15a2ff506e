//! # Tracker Runtime
//!
//! Wires the client together: local database, HTTP remote, session store,
//! timer, auto-saver and the intent controller.
//!
//! ## Startup Sequence
//! ```text
//! Tracker::start(config)
//!   1. validate config
//!   2. open SQLite at [storage].database_path (or the platform data dir)
//!   3. SessionStore::open        (reload live session + owning user)
//!   4. recover_from_remote       (best effort, only when nothing is live)
//!   5. TimerService::restore     (timer-state slot)
//!   6. spawn AutoSaver loop      (30s ticks, 1s retry poll)
//!   7. spawn timer display ticker (1s)
//! ```
//!
//! ## Shutdown Sequence
//! ```text
//! Tracker::shutdown()
//!   1. persist_local   (last local write)
//!   2. stop auto-saver and ticker
//!   3. close the pool
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use fitnesswise_db::{Database, DbConfig};

use crate::autosave::{AutoSaveHandle, AutoSaver};
use crate::clock::{Clock, SystemClock};
use crate::config::TrackerConfig;
use crate::error::{SyncError, SyncResult};
use crate::events::{EventBus, LoggingListener};
use crate::intents::WorkoutController;
use crate::remote::{HttpRemote, RemoteApi};
use crate::store::SessionStore;
use crate::timer_service::{TickerHandle, TimerService};

/// Default `RUST_LOG` filter for client hosts.
pub const DEFAULT_LOG_FILTER: &str = "info,fitnesswise=debug";

/// Display refresh period of the workout timer.
const TIMER_DISPLAY_PERIOD: Duration = Duration::from_secs(1);

/// Installs a `tracing` subscriber honouring `RUST_LOG`.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

/// A running client.
pub struct Tracker {
    config: TrackerConfig,
    db: Database,
    store: Arc<SessionStore>,
    timer: Arc<TimerService>,
    autosaver: Arc<AutoSaver>,
    controller: WorkoutController,
    autosave_handle: AutoSaveHandle,
    ticker: TickerHandle,
}

impl Tracker {
    /// Starts the client against the configured database and server.
    pub async fn start(config: TrackerConfig) -> SyncResult<Self> {
        config.validate()?;

        let path = config.database_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                SyncError::Storage(format!("Cannot create {}: {}", parent.display(), e))
            })?;
        }
        let db = Database::new(DbConfig::new(path)).await?;

        let remote = Arc::new(HttpRemote::new(
            &config.remote.base_url,
            config.request_timeout(),
        )?);

        Self::start_with(config, db, remote, Arc::new(SystemClock)).await
    }

    /// Starts the client from already-built parts.
    pub async fn start_with(
        config: TrackerConfig,
        db: Database,
        remote: Arc<dyn RemoteApi>,
        clock: Arc<dyn Clock>,
    ) -> SyncResult<Self> {
        info!(
            api = %config.remote.base_url,
            autosave_secs = config.autosave.interval_secs,
            "Starting tracker"
        );

        let events = Arc::new(EventBus::new());
        events.add_listener(Arc::new(LoggingListener));

        let store = Arc::new(SessionStore::open(db.clone(), clock.clone(), remote.clone(), events).await?);

        if let Err(e) = store.recover_from_remote().await {
            warn!(error = %e, "Could not recover session from server");
        }

        let timer = Arc::new(TimerService::restore(db.clone(), clock, store.clone()).await?);

        let autosaver = Arc::new(AutoSaver::new(store.clone(), remote, config.autosave_options()));
        let autosave_handle = autosaver.clone().spawn();
        let ticker = timer.clone().spawn_ticker(TIMER_DISPLAY_PERIOD);

        let controller = WorkoutController::new(
            store.clone(),
            timer.clone(),
            Some(autosave_handle.clone()),
        );

        info!("Tracker started");
        Ok(Tracker {
            config,
            db,
            store,
            timer,
            autosaver,
            controller,
            autosave_handle,
            ticker,
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn controller(&self) -> &WorkoutController {
        &self.controller
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn timer(&self) -> &Arc<TimerService> {
        &self.timer
    }

    pub fn autosaver(&self) -> &Arc<AutoSaver> {
        &self.autosaver
    }

    /// Host is about to be suspended: write the live session now.
    pub async fn on_background(&self) -> SyncResult<()> {
        self.store.persist_local().await?;
        Ok(())
    }

    /// Writes the session one last time and stops background tasks.
    pub async fn shutdown(self) -> SyncResult<()> {
        info!("Shutting down tracker");

        if let Err(e) = self.store.persist_local().await {
            warn!(error = %e, "Final local save failed");
        }

        let _ = self.autosave_handle.shutdown().await;
        let _ = self.ticker.shutdown().await;
        self.db.close().await;

        info!("Tracker stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::testing::ScriptedRemote;
    use fitnesswise_core::{User, WorkoutProgram};
    use fitnesswise_db::SlotKey;

    fn user(id: i64) -> User {
        User {
            id,
            email: "a@example.com".into(),
            firebase_uid: format!("uid-{}", id),
            username: "a".into(),
            current_streak: 0,
            total_workouts: 0,
            created_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_start_workout_saves_immediately() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let remote = Arc::new(ScriptedRemote::new());
        let tracker = Tracker::start_with(
            TrackerConfig::default(),
            db,
            remote.clone(),
            Arc::new(ManualClock::default()),
        )
        .await
        .unwrap();

        tracker.controller().login(&user(6)).await.unwrap();
        tracker
            .controller()
            .start_workout(WorkoutProgram::B)
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(remote.upsert_calls(), 1);
        assert_eq!(remote.upserted()[0].0, 6);

        tracker.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_restart_restores_session() {
        let dir = std::env::temp_dir().join(format!("fitnesswise-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("tracker.db");

        let clock = Arc::new(ManualClock::default());
        let remote = Arc::new(ScriptedRemote::new());

        let db = Database::new(DbConfig::new(&path)).await.unwrap();
        let tracker = Tracker::start_with(TrackerConfig::default(), db, remote.clone(), clock.clone())
            .await
            .unwrap();
        tracker
            .controller()
            .start_workout(WorkoutProgram::A)
            .await
            .unwrap();
        tracker.controller().set_reps(2, 1, 9).await.unwrap();
        tracker.controller().start_timer().await.unwrap();
        tracker.shutdown().await.unwrap();

        clock.advance(chrono::Duration::seconds(20));

        let db = Database::new(DbConfig::new(&path)).await.unwrap();
        let last_save: Option<chrono::DateTime<chrono::Utc>> =
            db.slots().get(SlotKey::LastSave).await.unwrap();
        assert!(last_save.is_some());

        let tracker = Tracker::start_with(TrackerConfig::default(), db, remote, clock)
            .await
            .unwrap();
        let live = tracker.store().live_session().await.unwrap();
        assert_eq!(live.program, WorkoutProgram::A);
        assert_eq!(live.set(2, 1).unwrap().completed_reps, 9);
        assert_eq!(tracker.timer().elapsed_ms().await, 20_000);

        tracker.shutdown().await.unwrap();
        let _ = std::fs::remove_dir_all(dir);
    }
}
