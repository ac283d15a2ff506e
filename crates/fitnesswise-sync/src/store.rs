//! # Session Store
//!
//! Sole owner of the live workout session.
//!
//! ## Mutation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          SessionStore                                   │
//! │                                                                         │
//! │  intent ──► lock state ──► clone live session ──► apply change          │
//! │                                                      │                  │
//! │                                                      ▼                  │
//! │                                  touch(lastUpdated) + write slot        │
//! │                                                      │                  │
//! │                          ┌───────────── ok ──────────┴── err ──┐        │
//! │                          ▼                                     ▼        │
//! │                 commit in memory                  in-memory unchanged   │
//! │                 unlock, emit event                return SyncError      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Mutations are serialized by one async mutex held across the in-memory
//! update and the local write. Remote calls are never made while it is held.
//!
//! ## Completion
//! ```text
//! complete_session()
//!   ├── history.archive()  (append row + clear live slots, one transaction)
//!   ├── emit session-completed
//!   └── spawn report task (not awaited):
//!         POST   /workouts
//!         GET    /users/{id}  →  PATCH /users/{id} (+1 workouts, +1 streak)
//!         DELETE /sessions/user/{id}
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use fitnesswise_core::{
    ArchivedWorkout, ExerciseTemplate, NewWorkout, TimerState, UserUpdate, WorkoutProgram,
    WorkoutSession,
};
use fitnesswise_db::{Database, DbError, SlotKey};

use crate::clock::Clock;
use crate::error::{SyncError, SyncResult};
use crate::events::{EventBus, SessionEvent};
use crate::remote::RemoteApi;

#[derive(Debug, Default)]
struct StoreState {
    live: Option<WorkoutSession>,
    user_id: Option<i64>,
}

/// Result of [`SessionStore::complete_session`].
#[derive(Debug)]
pub struct CompletedSession {
    pub archived: ArchivedWorkout,
    /// Background completion report, when the session had an owner.
    pub report: Option<JoinHandle<()>>,
}

/// Owner of the live session and its local persistence.
pub struct SessionStore {
    db: Database,
    clock: Arc<dyn Clock>,
    remote: Arc<dyn RemoteApi>,
    events: Arc<EventBus>,
    state: Mutex<StoreState>,
}

impl SessionStore {
    /// Opens the store, reloading the live session and the owning user from
    /// local storage.
    ///
    /// An unreadable or structurally invalid stored session is logged and
    /// discarded; startup continues without it.
    pub async fn open(
        db: Database,
        clock: Arc<dyn Clock>,
        remote: Arc<dyn RemoteApi>,
        events: Arc<EventBus>,
    ) -> SyncResult<Self> {
        let slots = db.slots();

        let user_id = match slots.get::<i64>(SlotKey::OwningUserId).await {
            Ok(id) => id,
            Err(DbError::CorruptSlot { reason, .. }) => {
                warn!(%reason, "Discarding unreadable owning user id");
                slots.remove(SlotKey::OwningUserId).await?;
                None
            }
            Err(e) => return Err(e.into()),
        };

        let live = match slots.get::<WorkoutSession>(SlotKey::LiveSession).await {
            Ok(Some(session)) => match session.validate() {
                Ok(()) => Some(session),
                Err(e) => {
                    warn!(error = %e, "Discarding invalid stored session");
                    slots.remove(SlotKey::LiveSession).await?;
                    None
                }
            },
            Ok(None) => None,
            Err(DbError::CorruptSlot { reason, .. }) => {
                warn!(%reason, "Discarding unreadable stored session");
                slots.remove(SlotKey::LiveSession).await?;
                None
            }
            Err(e) => return Err(e.into()),
        };

        let loaded = live.as_ref().map(|s| s.program);
        info!(
            restored = loaded.is_some(),
            user_id = ?user_id,
            "Session store opened"
        );

        let store = SessionStore {
            db,
            clock,
            remote,
            events,
            state: Mutex::new(StoreState { live, user_id }),
        };

        if let Some(program) = loaded {
            store.events.emit(SessionEvent::SessionLoaded { program });
        }

        Ok(store)
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// A copy of the live session.
    pub async fn live_session(&self) -> Option<WorkoutSession> {
        self.state.lock().await.live.clone()
    }

    pub async fn has_live_session(&self) -> bool {
        self.state.lock().await.live.is_some()
    }

    pub async fn user_id(&self) -> Option<i64> {
        self.state.lock().await.user_id
    }

    /// Owner of the live session, if a session is live and owned.
    pub async fn live_owner(&self) -> Option<i64> {
        self.state.lock().await.live.as_ref().and_then(|s| s.owner_user_id)
    }

    /// Archived workouts, newest first.
    pub async fn history(&self, limit: u32) -> SyncResult<Vec<ArchivedWorkout>> {
        Ok(self.db.history().list(limit).await?)
    }

    /// When the live session was last written by [`Self::persist_local`].
    pub async fn last_saved_at(&self) -> SyncResult<Option<DateTime<Utc>>> {
        Ok(self.db.slots().get(SlotKey::LastSave).await?)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Starts a new session, replacing any live one.
    ///
    /// The new session belongs to the current user, if any.
    pub async fn start_session(
        &self,
        program: WorkoutProgram,
        templates: &[ExerciseTemplate],
    ) -> SyncResult<WorkoutSession> {
        if templates.is_empty() {
            return Err(SyncError::Validation(format!(
                "program {} has no exercises",
                program
            )));
        }

        let session = {
            let mut state = self.state.lock().await;
            let session = WorkoutSession::start(program, templates, self.clock.now(), state.user_id);

            self.db.slots().put(SlotKey::LiveSession, &session).await?;
            if state.live.is_some() {
                debug!("Replacing live session");
            }
            state.live = Some(session.clone());
            session
        };

        info!(
            %program,
            exercises = session.exercises.len(),
            owner = ?session.owner_user_id,
            "Session started"
        );
        self.events.emit(SessionEvent::SessionStarted { program });
        Ok(session)
    }

    /// Sets a set's completed rep count. Out-of-range indices are a no-op.
    ///
    /// Returns true if the session changed.
    pub async fn update_set_reps(
        &self,
        exercise_index: usize,
        set_index: usize,
        reps: u32,
    ) -> SyncResult<bool> {
        let applied = self
            .apply(|session| {
                let set = session.set_mut(exercise_index, set_index)?;
                set.completed_reps = reps;
                Some((
                    (),
                    SessionEvent::SetUpdated {
                        exercise_index,
                        set_index,
                        completed_reps: reps,
                    },
                ))
            })
            .await?;
        Ok(applied.is_some())
    }

    /// Flips a set's completion flag, independent of its rep count.
    ///
    /// Returns the new flag, or `None` for out-of-range indices.
    pub async fn toggle_set_completion(
        &self,
        exercise_index: usize,
        set_index: usize,
    ) -> SyncResult<Option<bool>> {
        self.apply(|session| {
            let set = session.set_mut(exercise_index, set_index)?;
            set.completed = !set.completed;
            let completed = set.completed;
            Some((
                completed,
                SessionEvent::SetCompleted {
                    exercise_index,
                    set_index,
                    completed,
                },
            ))
        })
        .await
    }

    /// Moves to an exercise. An out-of-range index is a no-op; callers clamp.
    pub async fn set_current_exercise(&self, index: usize) -> SyncResult<bool> {
        let applied = self
            .apply(|session| {
                if index >= session.exercises.len() {
                    return None;
                }
                session.current_exercise_index = index;
                Some(((), SessionEvent::ExerciseChanged { index }))
            })
            .await?;
        Ok(applied.is_some())
    }

    /// Overwrites the session's timer state.
    pub async fn update_timer_state(&self, timer: TimerState) -> SyncResult<bool> {
        let applied = self
            .apply(|session| {
                session.timer_state = timer.clone();
                Some(((), SessionEvent::TimerUpdated { state: timer }))
            })
            .await?;
        Ok(applied.is_some())
    }

    /// Archives the live session and clears it.
    ///
    /// The remote report runs in the background; its failures are only
    /// logged. Returns `None` if there was no live session.
    pub async fn complete_session(&self) -> SyncResult<Option<CompletedSession>> {
        let archived = {
            let mut state = self.state.lock().await;
            let Some(live) = state.live.clone() else {
                return Ok(None);
            };

            let archived = live.archive(self.clock.now());
            self.db.history().archive(&archived).await?;
            state.live = None;
            archived
        };

        info!(
            id = %archived.id,
            program = %archived.session.program,
            duration_secs = archived.duration_secs,
            sets = archived.session.completed_sets(),
            "Session completed"
        );
        self.events.emit(SessionEvent::SessionCompleted {
            id: archived.id,
            program: archived.session.program,
            duration_secs: archived.duration_secs,
        });

        let report = archived.session.owner_user_id.map(|user_id| {
            tokio::spawn(report_completion(
                self.remote.clone(),
                user_id,
                archived.clone(),
            ))
        });

        Ok(Some(CompletedSession { archived, report }))
    }

    /// Drops the live session and the timer slot without archiving.
    ///
    /// Returns true if a session was live.
    pub async fn delete_session(&self) -> SyncResult<bool> {
        let existed = {
            let mut state = self.state.lock().await;
            let slots = self.db.slots();
            slots.remove(SlotKey::LiveSession).await?;
            slots.remove(SlotKey::TimerState).await?;
            state.live.take().is_some()
        };

        info!(existed, "Session deleted");
        self.events.emit(SessionEvent::SessionDeleted);
        Ok(existed)
    }

    /// Associates the store with a user, or with nobody.
    ///
    /// An unowned live session is adopted by the new user.
    pub async fn set_user(&self, user_id: Option<i64>) -> SyncResult<()> {
        {
            let mut state = self.state.lock().await;
            let slots = self.db.slots();

            match user_id {
                Some(id) => slots.put(SlotKey::OwningUserId, &id).await?,
                None => {
                    slots.remove(SlotKey::OwningUserId).await?;
                }
            }

            if let (Some(id), Some(live)) = (user_id, state.live.as_ref()) {
                if live.owner_user_id.is_none() {
                    let mut owned = live.clone();
                    owned.owner_user_id = Some(id);
                    owned.touch(self.clock.now());
                    slots.put(SlotKey::LiveSession, &owned).await?;
                    state.live = Some(owned);
                    debug!(user_id = id, "Live session attached to user");
                }
            }

            state.user_id = user_id;
        }

        info!(user_id = ?user_id, "User changed");
        self.events.emit(SessionEvent::UserChanged { user_id });
        Ok(())
    }

    /// Writes the live session to its slot and stamps `last-save`.
    ///
    /// Returns the snapshot that was written, or `None` with no live session.
    pub async fn persist_local(&self) -> SyncResult<Option<WorkoutSession>> {
        let state = self.state.lock().await;
        let Some(live) = state.live.as_ref() else {
            return Ok(None);
        };

        let slots = self.db.slots();
        slots.put(SlotKey::LiveSession, live).await?;
        slots.put(SlotKey::LastSave, &self.clock.now()).await?;

        Ok(Some(live.clone()))
    }

    /// Adopts the server's copy of the user's session when there is nothing
    /// live locally.
    ///
    /// A 404 means the server has nothing; that is `Ok(None)`.
    pub async fn recover_from_remote(&self) -> SyncResult<Option<WorkoutSession>> {
        let user_id = {
            let state = self.state.lock().await;
            match (state.live.is_some(), state.user_id) {
                (false, Some(id)) => id,
                _ => return Ok(None),
            }
        };

        let Some(stored) = self.remote.fetch_session(user_id).await? else {
            debug!(user_id, "No session on server");
            return Ok(None);
        };

        if let Err(e) = stored.session_data.validate() {
            warn!(user_id, error = %e, "Ignoring invalid session from server");
            return Ok(None);
        }

        let session = {
            let mut state = self.state.lock().await;
            // A session may have started while the request was in flight
            if state.live.is_some() || state.user_id != Some(user_id) {
                return Ok(None);
            }
            let session = stored.session_data;
            self.db.slots().put(SlotKey::LiveSession, &session).await?;
            state.live = Some(session.clone());
            session
        };

        info!(user_id, program = %session.program, "Session recovered from server");
        self.events.emit(SessionEvent::SessionLoaded {
            program: session.program,
        });
        Ok(Some(session))
    }

    /// Applies `change` to a copy of the live session, persists it, then
    /// commits it.
    ///
    /// `change` returns `None` to leave everything untouched.
    async fn apply<T>(
        &self,
        change: impl FnOnce(&mut WorkoutSession) -> Option<(T, SessionEvent)>,
    ) -> SyncResult<Option<T>> {
        let (value, event) = {
            let mut state = self.state.lock().await;
            let Some(live) = state.live.as_ref() else {
                return Ok(None);
            };

            let mut next = live.clone();
            let Some((value, event)) = change(&mut next) else {
                return Ok(None);
            };
            next.touch(self.clock.now());

            self.db.slots().put(SlotKey::LiveSession, &next).await?;
            state.live = Some(next);
            (value, event)
        };

        self.events.emit(event);
        Ok(Some(value))
    }
}

/// Best-effort completion report. Each step is independent; failures are
/// logged and the next step still runs.
async fn report_completion(remote: Arc<dyn RemoteApi>, user_id: i64, archived: ArchivedWorkout) {
    let workout = NewWorkout::from_archived(user_id, &archived);
    match remote.record_workout(&workout).await {
        Ok(record) => debug!(workout_id = record.id, user_id, "Workout recorded on server"),
        Err(e) => warn!(user_id, error = %e, "Failed to record completed workout"),
    }

    match remote.get_user(user_id).await {
        Ok(user) => {
            let update = UserUpdate::workout_completed(&user);
            if let Err(e) = remote.update_user(user_id, &update).await {
                warn!(user_id, error = %e, "Failed to update workout counters");
            }
        }
        Err(e) => warn!(user_id, error = %e, "Failed to read user for counter update"),
    }

    if let Err(e) = remote.delete_session(user_id).await {
        warn!(user_id, error = %e, "Failed to delete server session");
    }
}

// =============================================================================
// Tests
// =============================================================================
