//! # Auto-Saver
//!
//! Periodically writes the live session locally and replicates it to the
//! server, with a bounded retry queue for failed upserts.
//!
//! ## Scheduler Loop
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        AutoSaver::run                                   │
//! │                                                                         │
//! │  tokio::select! {                                                       │
//! │     autosave interval (30s, first tick one period in) ──► spawn tick    │
//! │     save_now trigger                                   ──► spawn tick    │
//! │     retry poll (1s)                   ──► spawn process_due_retries     │
//! │     session completed / deleted       ──► discard queue                 │
//! │     shutdown                          ──► break                         │
//! │  }                                                                      │
//! │                                                                         │
//! │  tick:                                                                  │
//! │    in flight? ── yes ──► skip                                           │
//! │        │ no                                                             │
//! │        ▼                                                                │
//! │    Saving ──► persist_local ──► owner? ── no ──► Saved ──(2s)──► Ready  │
//! │                                    │ yes                                │
//! │                                    ▼                                    │
//! │                             upsert_session                              │
//! │                        ok ──┴── err                                     │
//! │                        │         │                                      │
//! │          clear queue, Saved      Error, enqueue snapshot                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! At most one replication (tick or retry) is in flight at any time.
//!
//! Queued snapshots only replay while their user still owns the live
//! session. Completing or deleting the session discards the whole queue, so
//! a finished workout is never written back to the server.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use fitnesswise_core::{SaveStatus, WorkoutSession};

use crate::config::AutoSaveOptions;
use crate::error::{SyncError, SyncResult};
use crate::events::{EventBus, SessionEvent};
use crate::remote::RemoteApi;
use crate::retry::{RetryEntry, RetryPolicy, RetryQueue, RetryVerdict};
use crate::store::SessionStore;

// =============================================================================
// Tick Outcome
// =============================================================================

/// What a single auto-save tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing live; nothing written.
    NoSession,
    /// Another replication was outstanding; the tick did nothing.
    SkippedInFlight,
    /// Written locally; the session has no owner to replicate for.
    SavedLocally,
    /// Written locally and upserted.
    Replicated,
    /// Written locally; the upsert failed.
    Failed,
}

// =============================================================================
// Session Source
// =============================================================================

/// What the auto-saver needs from the owner of the live session.
#[async_trait]
pub trait SessionSource: Send + Sync {
    async fn has_live_session(&self) -> bool;

    /// Writes the live session locally and returns what was written.
    async fn persist_local(&self) -> SyncResult<Option<WorkoutSession>>;

    /// The user owning the live session, if a session is live and owned.
    async fn live_owner(&self) -> Option<i64>;

    fn events(&self) -> &Arc<EventBus>;
}

#[async_trait]
impl SessionSource for SessionStore {
    async fn has_live_session(&self) -> bool {
        SessionStore::has_live_session(self).await
    }

    async fn persist_local(&self) -> SyncResult<Option<WorkoutSession>> {
        SessionStore::persist_local(self).await
    }

    async fn live_owner(&self) -> Option<i64> {
        SessionStore::live_owner(self).await
    }

    fn events(&self) -> &Arc<EventBus> {
        SessionStore::events(self)
    }
}

// =============================================================================
// Save Status Cell
// =============================================================================

/// Save status plus a generation counter so a delayed `Saved → Ready`
/// revert can tell whether anything changed in between.
struct StatusCell {
    generation: Mutex<u64>,
    tx: watch::Sender<SaveStatus>,
    events: Arc<EventBus>,
}

impl StatusCell {
    fn new(events: Arc<EventBus>) -> Self {
        let (tx, _) = watch::channel(SaveStatus::Ready);
        StatusCell {
            generation: Mutex::new(0),
            tx,
            events,
        }
    }

    fn get(&self) -> SaveStatus {
        *self.tx.borrow()
    }

    /// Sets the status and returns its generation.
    fn set(&self, status: SaveStatus) -> u64 {
        let (generation, previous) = {
            let mut generation = self.generation.lock().unwrap_or_else(|e| e.into_inner());
            *generation += 1;
            (*generation, self.tx.send_replace(status))
        };
        self.notify(previous, status);
        generation
    }

    /// Sets the status only if nothing else was set since `generation`.
    fn set_if_current(&self, generation: u64, status: SaveStatus) -> bool {
        let previous = {
            let mut current = self.generation.lock().unwrap_or_else(|e| e.into_inner());
            if *current != generation {
                return false;
            }
            *current += 1;
            self.tx.send_replace(status)
        };
        self.notify(previous, status);
        true
    }

    fn notify(&self, previous: SaveStatus, status: SaveStatus) {
        if previous != status {
            debug!(from = %previous, to = %status, "Save status changed");
            self.events.emit(SessionEvent::SaveStatusChanged { status });
        }
    }
}

// =============================================================================
// In-Flight Guard
// =============================================================================

/// Clears the in-flight flag when dropped.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// =============================================================================
// Auto-Saver
// =============================================================================

/// Background local save and replication of the live session.
pub struct AutoSaver {
    source: Arc<dyn SessionSource>,
    remote: Arc<dyn RemoteApi>,
    queue: Mutex<RetryQueue>,
    in_flight: AtomicBool,
    status: Arc<StatusCell>,
    options: AutoSaveOptions,
}

/// Handle for controlling a spawned auto-saver.
#[derive(Clone)]
pub struct AutoSaveHandle {
    shutdown_tx: mpsc::Sender<()>,
    save_now_tx: mpsc::Sender<()>,
}

impl AutoSaveHandle {
    /// Requests an immediate tick, outside the regular period.
    ///
    /// Fails with [`SyncError::ShuttingDown`] once the loop has stopped.
    pub async fn save_now(&self) -> SyncResult<()> {
        self.save_now_tx
            .send(())
            .await
            .map_err(|_| SyncError::ShuttingDown)
    }

    /// Triggers graceful shutdown.
    pub async fn shutdown(&self) -> SyncResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| SyncError::ShuttingDown)
    }
}

impl AutoSaver {
    pub fn new(source: Arc<dyn SessionSource>, remote: Arc<dyn RemoteApi>, options: AutoSaveOptions) -> Self {
        let policy = RetryPolicy::new(options.retry_base_delay, options.max_attempts);
        let status = Arc::new(StatusCell::new(source.events().clone()));

        AutoSaver {
            source,
            remote,
            queue: Mutex::new(RetryQueue::new(policy)),
            in_flight: AtomicBool::new(false),
            status,
            options,
        }
    }

    pub fn status(&self) -> SaveStatus {
        self.status.get()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SaveStatus> {
        self.status.tx.subscribe()
    }

    pub fn queue_len(&self) -> usize {
        self.lock_queue().len()
    }

    pub fn queued_entries(&self) -> Vec<RetryEntry> {
        self.lock_queue().entries().cloned().collect()
    }

    /// Drops every queued snapshot. Returns how many were dropped.
    pub fn discard_pending(&self) -> usize {
        let mut queue = self.lock_queue();
        let dropped = queue.len();
        queue.clear();
        dropped
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn lock_queue(&self) -> std::sync::MutexGuard<'_, RetryQueue> {
        self.queue.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn try_begin(&self) -> Option<InFlightGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard(&self.in_flight))
    }

    /// `Saved`, reverting to `Ready` after the display window unless the
    /// status changes first.
    fn mark_saved(&self) {
        let generation = self.status.set(SaveStatus::Saved);
        let status = self.status.clone();
        let display = self.options.saved_display;

        tokio::spawn(async move {
            tokio::time::sleep(display).await;
            status.set_if_current(generation, SaveStatus::Ready);
        });
    }

    // =========================================================================
    // Tick
    // =========================================================================

    /// One auto-save pass.
    pub async fn tick(&self) -> SyncResult<TickOutcome> {
        let Some(_guard) = self.try_begin() else {
            debug!("Replication in flight, skipping tick");
            return Ok(TickOutcome::SkippedInFlight);
        };

        if !self.source.has_live_session().await {
            return Ok(TickOutcome::NoSession);
        }

        self.status.set(SaveStatus::Saving);

        let snapshot = match self.source.persist_local().await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                self.status.set(SaveStatus::Ready);
                return Ok(TickOutcome::NoSession);
            }
            Err(e) => {
                error!(error = %e, "Local save failed");
                self.status.set(SaveStatus::Error);
                return Err(e);
            }
        };

        let Some(user_id) = snapshot.owner_user_id else {
            debug!("No owner, session saved locally only");
            self.mark_saved();
            return Ok(TickOutcome::SavedLocally);
        };

        match self.remote.upsert_session(user_id, &snapshot).await {
            Ok(_) => {
                let discarded = self.discard_pending();
                debug!(user_id, discarded, "Session replicated");
                self.mark_saved();
                Ok(TickOutcome::Replicated)
            }
            Err(e) if e.is_retryable() => {
                warn!(user_id, error = %e, "Session upsert failed, queued for retry");
                self.lock_queue()
                    .enqueue(user_id, snapshot, Utc::now(), Instant::now());
                self.status.set(SaveStatus::Error);
                Ok(TickOutcome::Failed)
            }
            Err(e) => {
                warn!(user_id, error = %e, "Session upsert rejected, not retrying");
                self.status.set(SaveStatus::Failed);
                Ok(TickOutcome::Failed)
            }
        }
    }

    // =========================================================================
    // Retries
    // =========================================================================

    /// Attempts every due retry entry, oldest first, stopping at the first
    /// success.
    ///
    /// An entry whose user no longer owns the live session is dropped
    /// without an attempt. Returns the number of attempts made.
    pub async fn process_due_retries(&self) -> SyncResult<usize> {
        let due = self.lock_queue().due(Instant::now());
        if due.is_empty() {
            return Ok(0);
        }

        let Some(_guard) = self.try_begin() else {
            return Ok(0);
        };

        let owner = self.source.live_owner().await;

        let mut attempts = 0;
        for entry in due {
            if owner != Some(entry.user_id) {
                self.lock_queue().remove(entry.id);
                debug!(
                    entry = %entry.id,
                    user_id = entry.user_id,
                    "Session no longer live for this user, dropping queued snapshot"
                );
                continue;
            }

            attempts += 1;
            match self.remote.upsert_session(entry.user_id, &entry.snapshot).await {
                Ok(_) => {
                    self.lock_queue().remove(entry.id);
                    info!(
                        entry = %entry.id,
                        retry_count = entry.retry_count,
                        "Queued session replicated"
                    );
                    self.mark_saved();
                    break;
                }
                Err(e) if !e.is_retryable() => {
                    self.lock_queue().remove(entry.id);
                    warn!(entry = %entry.id, error = %e, "Queued session rejected, dropping");
                    self.status.set(SaveStatus::Failed);
                }
                Err(e) => {
                    let verdict = self
                        .lock_queue()
                        .record_failure(entry.id, &e.to_string(), Instant::now());
                    match verdict {
                        Some(RetryVerdict::Rescheduled { retry_count, delay }) => {
                            debug!(
                                entry = %entry.id,
                                retry_count,
                                delay_ms = delay.as_millis() as u64,
                                error = %e,
                                "Retry failed, rescheduled"
                            );
                        }
                        Some(RetryVerdict::Exhausted) => {
                            warn!(entry = %entry.id, error = %e, "Retries exhausted, dropping snapshot");
                            self.status.set(SaveStatus::Failed);
                        }
                        // Cleared by a successful auto-save meanwhile
                        None => {}
                    }
                }
            }
        }

        Ok(attempts)
    }

    // =========================================================================
    // Background Loop
    // =========================================================================

    /// Spawns the scheduler loop and returns its handle.
    pub fn spawn(self: Arc<Self>) -> AutoSaveHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let (save_now_tx, save_now_rx) = mpsc::channel(8);
        // Subscribed before spawning so no session event is missed
        let events = self.source.events().subscribe();

        tokio::spawn(self.run(shutdown_rx, save_now_rx, events));

        AutoSaveHandle {
            shutdown_tx,
            save_now_tx,
        }
    }

    async fn run(
        self: Arc<Self>,
        mut shutdown_rx: mpsc::Receiver<()>,
        mut save_now_rx: mpsc::Receiver<()>,
        mut events: broadcast::Receiver<SessionEvent>,
    ) {
        info!(
            interval_secs = self.options.interval.as_secs(),
            retry_poll_ms = self.options.retry_poll.as_millis() as u64,
            "Auto-saver starting"
        );

        let mut autosave = interval_at(Instant::now() + self.options.interval, self.options.interval);
        autosave.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut retry_poll = interval(self.options.retry_poll);
        retry_poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut events_open = true;

        loop {
            tokio::select! {
                _ = autosave.tick() => self.spawn_tick(),

                Some(()) = save_now_rx.recv() => self.spawn_tick(),

                _ = retry_poll.tick() => {
                    let this = self.clone();
                    tokio::spawn(async move {
                        if let Err(e) = this.process_due_retries().await {
                            error!(error = %e, "Retry pass failed");
                        }
                    });
                }

                event = events.recv(), if events_open => match event {
                    Ok(SessionEvent::SessionCompleted { .. }) | Ok(SessionEvent::SessionDeleted) => {
                        let dropped = self.discard_pending();
                        if dropped > 0 {
                            info!(dropped, "Session ended, pending retries discarded");
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "Auto-saver lagged behind session events");
                    }
                    Err(broadcast::error::RecvError::Closed) => events_open = false,
                },

                _ = shutdown_rx.recv() => {
                    info!("Auto-saver shutting down");
                    break;
                }
            }
        }

        info!("Auto-saver stopped");
    }

    fn spawn_tick(self: &Arc<Self>) {
        let this = self.clone();
        tokio::spawn(async move {
            match this.tick().await {
                Ok(outcome) => debug!(?outcome, "Auto-save tick"),
                Err(e) => error!(error = %e, "Auto-save tick failed"),
            }
        });
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::testing::{FixedSession, ScriptedRemote};
    use fitnesswise_core::{ProgramTemplate, WorkoutProgram};
    use fitnesswise_db::{Database, DbConfig};
    use std::time::Duration;

    fn options(interval: Duration) -> AutoSaveOptions {
        AutoSaveOptions {
            interval,
            saved_display: Duration::from_millis(50),
            retry_poll: Duration::from_millis(10),
            retry_base_delay: Duration::ZERO,
            max_attempts: 3,
        }
    }

    async fn setup(owner: Option<i64>, interval: Duration) -> (Arc<AutoSaver>, Arc<ScriptedRemote>, Arc<SessionStore>) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let remote = Arc::new(ScriptedRemote::new());
        let store = Arc::new(
            SessionStore::open(db, Arc::new(SystemClock), remote.clone(), Arc::new(EventBus::new()))
                .await
                .unwrap(),
        );
        store.set_user(owner).await.unwrap();

        let template = ProgramTemplate::for_program(WorkoutProgram::A);
        store
            .start_session(WorkoutProgram::A, &template.exercises)
            .await
            .unwrap();

        let saver = Arc::new(AutoSaver::new(store.clone(), remote.clone(), options(interval)));
        (saver, remote, store)
    }

    #[tokio::test]
    async fn test_no_owner_saves_locally_then_reverts_to_ready() {
        let (saver, remote, store) = setup(None, Duration::from_secs(3600)).await;

        assert_eq!(saver.tick().await.unwrap(), TickOutcome::SavedLocally);
        assert_eq!(saver.status(), SaveStatus::Saved);
        assert_eq!(remote.upsert_calls(), 0);
        assert!(store.last_saved_at().await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(saver.status(), SaveStatus::Ready);
    }

    #[tokio::test]
    async fn test_tick_without_session() {
        let (saver, _remote, store) = setup(Some(1), Duration::from_secs(3600)).await;
        store.delete_session().await.unwrap();

        assert_eq!(saver.tick().await.unwrap(), TickOutcome::NoSession);
        assert_eq!(saver.status(), SaveStatus::Ready);
    }

    #[tokio::test]
    async fn test_owner_tick_replicates_snapshot() {
        let (saver, remote, store) = setup(Some(5), Duration::from_secs(3600)).await;
        store.update_set_reps(0, 0, 8).await.unwrap();

        assert_eq!(saver.tick().await.unwrap(), TickOutcome::Replicated);
        assert_eq!(saver.status(), SaveStatus::Saved);

        let upserted = remote.upserted();
        assert_eq!(upserted.len(), 1);
        assert_eq!(upserted[0].0, 5);
        assert_eq!(upserted[0].1.set(0, 0).unwrap().completed_reps, 8);
    }

    #[tokio::test]
    async fn test_failure_queues_then_exhausts_after_three_retries() {
        let (saver, remote, _store) = setup(Some(1), Duration::from_secs(3600)).await;
        remote.fail_upserts(true);

        assert_eq!(saver.tick().await.unwrap(), TickOutcome::Failed);
        assert_eq!(saver.status(), SaveStatus::Error);
        let entries = saver.queued_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].retry_count, 0);

        for expected_left in [1, 1, 0] {
            assert_eq!(saver.process_due_retries().await.unwrap(), 1);
            assert_eq!(saver.queue_len(), expected_left);
        }
        assert_eq!(saver.status(), SaveStatus::Failed);
        assert_eq!(remote.upsert_calls(), 4);

        // Nothing further is attempted for the dropped entry
        assert_eq!(saver.process_due_retries().await.unwrap(), 0);
        assert_eq!(remote.upsert_calls(), 4);
    }

    #[tokio::test]
    async fn test_successful_autosave_discards_queue() {
        let (saver, remote, _store) = setup(Some(1), Duration::from_secs(3600)).await;
        remote.fail_upserts(true);
        saver.tick().await.unwrap();
        saver.tick().await.unwrap();
        assert_eq!(saver.queue_len(), 2);

        remote.fail_upserts(false);
        assert_eq!(saver.tick().await.unwrap(), TickOutcome::Replicated);
        assert_eq!(saver.queue_len(), 0);
    }

    #[tokio::test]
    async fn test_successful_retry_removes_entry() {
        let (saver, remote, _store) = setup(Some(1), Duration::from_secs(3600)).await;
        remote.fail_upserts(true);
        saver.tick().await.unwrap();

        remote.fail_upserts(false);
        assert_eq!(saver.process_due_retries().await.unwrap(), 1);
        assert_eq!(saver.queue_len(), 0);
        assert_eq!(saver.status(), SaveStatus::Saved);
        assert_eq!(remote.upserted().len(), 1);
    }

    #[tokio::test]
    async fn test_tick_skipped_while_upsert_outstanding() {
        let (saver, remote, _store) = setup(Some(1), Duration::from_secs(3600)).await;
        let gate = remote.hold_upserts();

        let first = {
            let saver = saver.clone();
            tokio::spawn(async move { saver.tick().await })
        };
        remote.upsert_started().await;
        assert!(saver.is_in_flight());

        assert_eq!(saver.tick().await.unwrap(), TickOutcome::SkippedInFlight);
        assert_eq!(saver.process_due_retries().await.unwrap(), 0);
        assert_eq!(remote.upsert_calls(), 1);

        gate.notify_one();
        assert_eq!(first.await.unwrap().unwrap(), TickOutcome::Replicated);
        assert!(!saver.is_in_flight());
    }

    #[tokio::test]
    async fn test_status_events_emitted() {
        let (saver, _remote, store) = setup(Some(1), Duration::from_secs(3600)).await;
        let mut rx = store.events().subscribe();

        saver.tick().await.unwrap();

        let mut statuses = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let SessionEvent::SaveStatusChanged { status } = event {
                statuses.push(status);
            }
        }
        assert_eq!(statuses, vec![SaveStatus::Saving, SaveStatus::Saved]);
    }

    #[tokio::test]
    async fn test_spawned_loop_ticks_and_honors_save_now() {
        let (saver, remote, _store) = setup(Some(1), Duration::from_millis(100)).await;
        let handle = saver.clone().spawn();

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert!(remote.upsert_calls() >= 2);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_save_now_triggers_immediate_tick() {
        let (saver, remote, _store) = setup(Some(1), Duration::from_secs(3600)).await;
        let handle = saver.clone().spawn();

        handle.save_now().await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(remote.upsert_calls(), 1);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_completion_drops_queued_snapshot() {
        let (saver, remote, store) = setup(Some(1), Duration::from_secs(3600)).await;
        remote.fail_upserts(true);
        assert_eq!(saver.tick().await.unwrap(), TickOutcome::Failed);
        assert_eq!(saver.queue_len(), 1);

        let completed = store.complete_session().await.unwrap().unwrap();
        completed.report.unwrap().await.unwrap();
        assert_eq!(remote.deleted_sessions(), vec![1]);

        // Server is back, but the finished session must not be written again
        remote.fail_upserts(false);
        assert_eq!(saver.process_due_retries().await.unwrap(), 0);
        assert_eq!(saver.queue_len(), 0);
        assert_eq!(remote.upsert_calls(), 1);
        assert!(remote.fetch_session(1).await.unwrap().is_none());
        assert!(store.recover_from_remote().await.unwrap().is_none());
        assert!(!store.has_live_session().await);
    }

    #[tokio::test]
    async fn test_retry_skipped_for_session_of_another_user() {
        let (saver, remote, store) = setup(Some(1), Duration::from_secs(3600)).await;
        remote.fail_upserts(true);
        saver.tick().await.unwrap();

        store.delete_session().await.unwrap();
        store.set_user(Some(2)).await.unwrap();
        let template = ProgramTemplate::for_program(WorkoutProgram::B);
        store
            .start_session(WorkoutProgram::B, &template.exercises)
            .await
            .unwrap();

        remote.fail_upserts(false);
        assert_eq!(saver.process_due_retries().await.unwrap(), 0);
        assert_eq!(saver.queue_len(), 0);
        assert!(remote.upserted().is_empty());
    }

    #[tokio::test]
    async fn test_loop_discards_queue_on_session_end() {
        let (_, remote, store) = setup(Some(1), Duration::from_secs(3600)).await;
        let mut slow = options(Duration::from_secs(3600));
        slow.retry_base_delay = Duration::from_secs(3600);
        let saver = Arc::new(AutoSaver::new(store.clone(), remote.clone(), slow));
        let handle = saver.clone().spawn();

        remote.fail_upserts(true);
        saver.tick().await.unwrap();
        assert_eq!(saver.queue_len(), 1);

        store.delete_session().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(saver.queue_len(), 0);

        let template = ProgramTemplate::for_program(WorkoutProgram::C);
        store
            .start_session(WorkoutProgram::C, &template.exercises)
            .await
            .unwrap();
        saver.tick().await.unwrap();
        assert_eq!(saver.queue_len(), 1);

        store.complete_session().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(saver.queue_len(), 0);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_save_now_after_shutdown_reports_shutting_down() {
        let (saver, _remote, _store) = setup(Some(1), Duration::from_secs(3600)).await;
        let handle = saver.clone().spawn();

        handle.shutdown().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(matches!(handle.save_now().await, Err(SyncError::ShuttingDown)));
        assert!(matches!(handle.shutdown().await, Err(SyncError::ShuttingDown)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_follows_production_retry_schedule() {
        let remote = Arc::new(ScriptedRemote::new());
        remote.fail_upserts(true);
        let saver = Arc::new(AutoSaver::new(
            Arc::new(FixedSession::owned_by(1)),
            remote.clone(),
            AutoSaveOptions::default(),
        ));

        let start = Instant::now();
        let at = |secs: f64| start + Duration::from_secs_f64(secs);
        let handle = saver.clone().spawn();

        tokio::time::sleep_until(at(29.5)).await;
        assert_eq!(remote.upsert_calls(), 0);

        // First period fails and queues the snapshot
        tokio::time::sleep_until(at(30.5)).await;
        assert_eq!(remote.upsert_calls(), 1);
        assert_eq!(saver.status(), SaveStatus::Error);
        let entries = saver.queued_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].retry_count, 0);
        let first = entries[0].id;

        // Retries 5s, 10s then 20s apart
        tokio::time::sleep_until(at(34.5)).await;
        assert_eq!(remote.upsert_calls(), 1);
        tokio::time::sleep_until(at(35.5)).await;
        assert_eq!(remote.upsert_calls(), 2);
        assert_eq!(saver.queued_entries()[0].retry_count, 1);

        tokio::time::sleep_until(at(44.5)).await;
        assert_eq!(remote.upsert_calls(), 2);
        tokio::time::sleep_until(at(45.5)).await;
        assert_eq!(remote.upsert_calls(), 3);
        assert_eq!(saver.queued_entries()[0].retry_count, 2);

        // Second period fails too and queues its own snapshot
        tokio::time::sleep_until(at(60.5)).await;
        assert_eq!(remote.upsert_calls(), 4);
        assert_eq!(saver.queue_len(), 2);

        tokio::time::sleep_until(at(64.5)).await;
        assert_eq!(remote.upsert_calls(), 4);

        // Third retry of the first snapshot exhausts it
        tokio::time::sleep_until(at(65.5)).await;
        assert_eq!(remote.upsert_calls(), 6);
        assert_eq!(saver.status(), SaveStatus::Failed);
        let entries = saver.queued_entries();
        assert_eq!(entries.len(), 1);
        assert_ne!(entries[0].id, first);
        assert_eq!(entries[0].retry_count, 1);

        // Nothing more for the dropped snapshot before the next period
        tokio::time::sleep_until(at(74.5)).await;
        assert_eq!(remote.upsert_calls(), 6);
        assert!(saver.queued_entries().iter().all(|e| e.id != first));

        handle.shutdown().await.unwrap();
    }
}
