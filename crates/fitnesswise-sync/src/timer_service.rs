//! # Timer Service
//!
//! Drives the pure [`Timer`] against a [`Clock`], persists every transition
//! to the `timer-state` slot and mirrors it into the live session.
//!
//! ```text
//!   start/pause/stop/reset ──► Timer (under lock) ──► snapshot
//!                                                        │
//!                              ┌─────────────────────────┤
//!                              ▼                         ▼
//!                     timer-state slot        SessionStore::update_timer_state
//!
//!   ticker (1s) ──► elapsed_ms(now) ──► watch channel (display only)
//! ```
//!
//! The ticker never feeds elapsed time back into the timer. Elapsed time is
//! always recomputed from the wall clock, so a suspended process reads the
//! right value the moment it resumes.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, Mutex};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use fitnesswise_core::{Timer, TimerPhase, TimerState};
use fitnesswise_db::{Database, DbError, SlotKey};

use crate::clock::Clock;
use crate::error::{SyncError, SyncResult};
use crate::store::SessionStore;

/// Wall-clock workout timer with local persistence.
pub struct TimerService {
    timer: Mutex<Timer>,
    clock: Arc<dyn Clock>,
    db: Database,
    store: Arc<SessionStore>,
    display: watch::Sender<u64>,
}

/// Handle for a spawned display ticker.
#[derive(Clone)]
pub struct TickerHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl TickerHandle {
    pub async fn shutdown(&self) -> SyncResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| SyncError::ShuttingDown)
    }
}

impl TimerService {
    /// Restores the timer from the `timer-state` slot, falling back to the
    /// live session's copy.
    ///
    /// A running snapshot keeps running from its start reference; a stopped
    /// one comes back paused.
    pub async fn restore(
        db: Database,
        clock: Arc<dyn Clock>,
        store: Arc<SessionStore>,
    ) -> SyncResult<Self> {
        let slots = db.slots();
        let persisted = match slots.get::<TimerState>(SlotKey::TimerState).await {
            Ok(state) => state,
            Err(DbError::CorruptSlot { reason, .. }) => {
                warn!(%reason, "Discarding unreadable timer state");
                slots.remove(SlotKey::TimerState).await?;
                None
            }
            Err(e) => return Err(e.into()),
        };

        let state = match persisted {
            Some(state) => Some(state),
            None => store.live_session().await.map(|s| s.timer_state),
        };
        let timer = state.as_ref().map(Timer::from_state).unwrap_or_default();

        let elapsed = timer.elapsed_ms(clock.now());
        info!(phase = ?timer.phase(), elapsed_ms = elapsed, "Timer restored");

        let (display, _) = watch::channel(elapsed);
        Ok(TimerService {
            timer: Mutex::new(timer),
            clock,
            db,
            store,
            display,
        })
    }

    pub async fn phase(&self) -> TimerPhase {
        self.timer.lock().await.phase()
    }

    pub async fn elapsed_ms(&self) -> u64 {
        self.timer.lock().await.elapsed_ms(self.clock.now())
    }

    pub async fn snapshot(&self) -> TimerState {
        self.timer.lock().await.snapshot(self.clock.now())
    }

    /// Starts or resumes. Returns false when nothing changed.
    pub async fn start(&self) -> SyncResult<bool> {
        self.transition(|timer, now| timer.start(now)).await
    }

    /// Pauses a running timer. Returns false when nothing changed.
    pub async fn pause(&self) -> SyncResult<bool> {
        self.transition(|timer, now| timer.pause(now)).await
    }

    /// Freezes the timer at its final value.
    pub async fn stop(&self) -> SyncResult<bool> {
        self.transition(|timer, now| timer.stop(now)).await
    }

    /// Back to idle at zero; the `timer-state` slot is cleared.
    pub async fn reset(&self) -> SyncResult<()> {
        let mut timer = self.timer.lock().await;
        timer.reset();

        self.db.slots().remove(SlotKey::TimerState).await?;
        self.store.update_timer_state(TimerState::default()).await?;
        self.display.send_replace(0);

        debug!("Timer reset");
        Ok(())
    }

    /// Recomputes elapsed time and publishes it to display subscribers.
    pub async fn refresh(&self) -> u64 {
        let elapsed = self.elapsed_ms().await;
        self.display.send_replace(elapsed);
        elapsed
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.display.subscribe()
    }

    /// Applies a timer transition and persists the result while holding the
    /// timer lock, so transitions land in storage in order.
    async fn transition(&self, change: impl FnOnce(&mut Timer, chrono::DateTime<chrono::Utc>) -> bool) -> SyncResult<bool> {
        let mut timer = self.timer.lock().await;
        let now = self.clock.now();
        if !change(&mut timer, now) {
            return Ok(false);
        }

        let snapshot = timer.snapshot(now);
        self.db.slots().put(SlotKey::TimerState, &snapshot).await?;
        self.store.update_timer_state(snapshot.clone()).await?;
        self.display.send_replace(snapshot.elapsed_ms);

        debug!(phase = ?timer.phase(), elapsed_ms = snapshot.elapsed_ms, "Timer transition");
        Ok(true)
    }

    /// Spawns a loop that refreshes the display value every `period`.
    pub fn spawn_ticker(self: Arc<Self>, period: Duration) -> TickerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        tokio::spawn(async move {
            let mut ticks = tokio::time::interval(period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticks.tick() => {
                        self.refresh().await;
                    }
                    _ = shutdown_rx.recv() => {
                        debug!("Timer ticker stopped");
                        break;
                    }
                }
            }
        });

        TickerHandle { shutdown_tx }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::events::EventBus;
    use crate::testing::ScriptedRemote;
    use chrono::Duration as ChronoDuration;
    use fitnesswise_core::{ProgramTemplate, WorkoutProgram};
    use fitnesswise_db::DbConfig;

    struct Fixture {
        db: Database,
        clock: Arc<ManualClock>,
        store: Arc<SessionStore>,
        timer: Arc<TimerService>,
    }

    async fn fixture() -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let clock = Arc::new(ManualClock::default());
        let store = Arc::new(
            SessionStore::open(
                db.clone(),
                clock.clone(),
                Arc::new(ScriptedRemote::new()),
                Arc::new(EventBus::new()),
            )
            .await
            .unwrap(),
        );
        let timer = Arc::new(
            TimerService::restore(db.clone(), clock.clone(), store.clone())
                .await
                .unwrap(),
        );
        Fixture {
            db,
            clock,
            store,
            timer,
        }
    }

    #[tokio::test]
    async fn test_paused_timer_ignores_suspension() {
        let f = fixture().await;
        assert!(f.timer.start().await.unwrap());
        f.clock.advance(ChronoDuration::seconds(10));
        assert!(f.timer.pause().await.unwrap());

        f.clock.advance(ChronoDuration::seconds(60));
        assert_eq!(f.timer.elapsed_ms().await, 10_000);
        assert_eq!(f.timer.phase().await, TimerPhase::Paused);
    }

    #[tokio::test]
    async fn test_running_timer_survives_restart() {
        let f = fixture().await;
        f.timer.start().await.unwrap();
        f.clock.advance(ChronoDuration::seconds(5));

        // Process killed and relaunched 30 seconds later
        f.clock.advance(ChronoDuration::seconds(30));
        let restored = TimerService::restore(f.db.clone(), f.clock.clone(), f.store.clone())
            .await
            .unwrap();

        assert_eq!(restored.phase().await, TimerPhase::Running);
        assert_eq!(restored.elapsed_ms().await, 35_000);
    }

    #[tokio::test]
    async fn test_stopped_timer_restores_paused() {
        let f = fixture().await;
        f.timer.start().await.unwrap();
        f.clock.advance(ChronoDuration::seconds(42));
        assert!(f.timer.stop().await.unwrap());
        assert!(!f.timer.start().await.unwrap());

        let restored = TimerService::restore(f.db.clone(), f.clock.clone(), f.store.clone())
            .await
            .unwrap();
        assert_eq!(restored.phase().await, TimerPhase::Paused);
        assert_eq!(restored.elapsed_ms().await, 42_000);
    }

    #[tokio::test]
    async fn test_transitions_mirror_into_live_session() {
        let f = fixture().await;
        let template = ProgramTemplate::for_program(WorkoutProgram::B);
        f.store
            .start_session(WorkoutProgram::B, &template.exercises)
            .await
            .unwrap();

        f.timer.start().await.unwrap();
        let live = f.store.live_session().await.unwrap();
        assert!(live.timer_state.running);
        assert!(live.timer_state.start_epoch.is_some());

        f.clock.advance(ChronoDuration::seconds(7));
        f.timer.pause().await.unwrap();
        let live = f.store.live_session().await.unwrap();
        assert!(!live.timer_state.running);
        assert_eq!(live.timer_state.elapsed_ms, 7_000);
    }

    #[tokio::test]
    async fn test_reset_clears_slot() {
        let f = fixture().await;
        f.timer.start().await.unwrap();
        f.clock.advance(ChronoDuration::seconds(3));
        f.timer.reset().await.unwrap();

        assert_eq!(f.timer.phase().await, TimerPhase::Idle);
        assert_eq!(f.timer.elapsed_ms().await, 0);
        let slot: Option<TimerState> = f.db.slots().get(SlotKey::TimerState).await.unwrap();
        assert!(slot.is_none());
    }

    #[tokio::test]
    async fn test_restore_falls_back_to_session_timer() {
        let f = fixture().await;
        let template = ProgramTemplate::for_program(WorkoutProgram::A);
        f.store
            .start_session(WorkoutProgram::A, &template.exercises)
            .await
            .unwrap();
        f.store
            .update_timer_state(TimerState {
                running: false,
                elapsed_ms: 90_000,
                start_epoch: None,
            })
            .await
            .unwrap();

        let restored = TimerService::restore(f.db.clone(), f.clock.clone(), f.store.clone())
            .await
            .unwrap();
        assert_eq!(restored.elapsed_ms().await, 90_000);
    }

    #[tokio::test]
    async fn test_ticker_publishes_elapsed() {
        let f = fixture().await;
        let mut display = f.timer.subscribe();
        f.timer.start().await.unwrap();
        f.clock.advance(ChronoDuration::seconds(3));

        let ticker = f.timer.clone().spawn_ticker(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(*display.borrow_and_update(), 3_000);
        ticker.shutdown().await.unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(matches!(ticker.shutdown().await, Err(SyncError::ShuttingDown)));
    }
}
