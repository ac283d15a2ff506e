//! # Workout Controller
//!
//! Translates user intents into store and timer operations. Clamping and
//! rep validation happen here; the store itself never clamps.
//!
//! ```text
//!   tap "+"          ──► increment_reps  ──► SessionStore::update_set_reps
//!   type "-3"        ──► set_reps        ──► ValidationError (rejected)
//!   swipe past end   ──► next_exercise   ──► clamp ──► set_current_exercise
//!   "Start workout"  ──► start_workout   ──► timer reset + start_session + save now
//!   "Finish"         ──► complete_workout──► timer stop + complete_session
//! ```

use std::sync::Arc;

use tracing::{info, warn};

use fitnesswise_core::validation::validate_rep_count;
use fitnesswise_core::{ProgramTemplate, User, WorkoutProgram, WorkoutSession, MAX_REPS_PER_SET};

use crate::autosave::AutoSaveHandle;
use crate::error::{SyncError, SyncResult};
use crate::store::{CompletedSession, SessionStore};
use crate::timer_service::TimerService;

/// Caller-facing entry point for workout intents.
pub struct WorkoutController {
    store: Arc<SessionStore>,
    timer: Arc<TimerService>,
    autosave: Option<AutoSaveHandle>,
}

impl WorkoutController {
    pub fn new(store: Arc<SessionStore>, timer: Arc<TimerService>, autosave: Option<AutoSaveHandle>) -> Self {
        WorkoutController {
            store,
            timer,
            autosave,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn timer(&self) -> &Arc<TimerService> {
        &self.timer
    }

    // =========================================================================
    // Session Lifecycle
    // =========================================================================

    /// Starts `program` from its template, with the timer back at zero.
    pub async fn start_workout(&self, program: WorkoutProgram) -> SyncResult<WorkoutSession> {
        let template = ProgramTemplate::for_program(program);

        self.timer.reset().await?;
        let session = self.store.start_session(program, &template.exercises).await?;

        if let Some(autosave) = &self.autosave {
            if let Err(e) = autosave.save_now().await {
                warn!(error = %e, "Could not request immediate save");
            }
        }
        Ok(session)
    }

    /// Freezes the timer, archives the session, then resets the timer.
    ///
    /// The timer is only paused before archiving, so a failed archive leaves
    /// a workout that can still be resumed.
    pub async fn complete_workout(&self) -> SyncResult<Option<CompletedSession>> {
        if !self.store.has_live_session().await {
            return Ok(None);
        }

        self.timer.pause().await?;
        let completed = self.store.complete_session().await?;
        self.timer.reset().await?;
        Ok(completed)
    }

    // =========================================================================
    // Sets
    // =========================================================================

    /// Adds one rep, capped at [`MAX_REPS_PER_SET`].
    pub async fn increment_reps(&self, exercise_index: usize, set_index: usize) -> SyncResult<bool> {
        let Some(current) = self.current_reps(exercise_index, set_index).await else {
            return Ok(false);
        };
        if current >= MAX_REPS_PER_SET {
            return Ok(false);
        }
        self.store
            .update_set_reps(exercise_index, set_index, current + 1)
            .await
    }

    /// Removes one rep, stopping at zero.
    pub async fn decrement_reps(&self, exercise_index: usize, set_index: usize) -> SyncResult<bool> {
        match self.current_reps(exercise_index, set_index).await {
            Some(current) if current > 0 => {
                self.store
                    .update_set_reps(exercise_index, set_index, current - 1)
                    .await
            }
            _ => Ok(false),
        }
    }

    /// Sets a rep count typed by the user. Negative or absurd values are
    /// rejected before the store sees them.
    pub async fn set_reps(&self, exercise_index: usize, set_index: usize, reps: i64) -> SyncResult<bool> {
        let reps = validate_rep_count(reps)?;
        self.store
            .update_set_reps(exercise_index, set_index, reps)
            .await
    }

    pub async fn toggle_set(&self, exercise_index: usize, set_index: usize) -> SyncResult<Option<bool>> {
        self.store
            .toggle_set_completion(exercise_index, set_index)
            .await
    }

    async fn current_reps(&self, exercise_index: usize, set_index: usize) -> Option<u32> {
        self.store
            .live_session()
            .await?
            .set(exercise_index, set_index)
            .map(|s| s.completed_reps)
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Moves to `index`, clamped into the exercise range.
    ///
    /// Returns the index the session ended up on, or `None` with no live
    /// session.
    pub async fn go_to_exercise(&self, index: i64) -> SyncResult<Option<usize>> {
        let Some(session) = self.store.live_session().await else {
            return Ok(None);
        };

        let clamped = session.clamp_exercise_index(index);
        if clamped != session.current_exercise_index {
            self.store.set_current_exercise(clamped).await?;
        }
        Ok(Some(clamped))
    }

    pub async fn next_exercise(&self) -> SyncResult<Option<usize>> {
        self.step_exercise(1).await
    }

    pub async fn previous_exercise(&self) -> SyncResult<Option<usize>> {
        self.step_exercise(-1).await
    }

    async fn step_exercise(&self, step: i64) -> SyncResult<Option<usize>> {
        let Some(session) = self.store.live_session().await else {
            return Ok(None);
        };
        self.go_to_exercise(session.current_exercise_index as i64 + step)
            .await
    }

    // =========================================================================
    // Timer
    // =========================================================================

    /// Starts the timer. Requires a live session.
    pub async fn start_timer(&self) -> SyncResult<bool> {
        if !self.store.has_live_session().await {
            return Err(SyncError::NoLiveSession);
        }
        self.timer.start().await
    }

    pub async fn pause_timer(&self) -> SyncResult<bool> {
        self.timer.pause().await
    }

    // =========================================================================
    // Identity
    // =========================================================================

    /// Associates the signed-in user and, if nothing is live locally, picks
    /// up the session the server holds for them.
    pub async fn login(&self, user: &User) -> SyncResult<Option<WorkoutSession>> {
        self.store.set_user(Some(user.id)).await?;
        info!(user_id = user.id, username = %user.username, "Signed in");

        match self.store.recover_from_remote().await {
            Ok(recovered) => Ok(recovered),
            Err(e) => {
                warn!(user_id = user.id, error = %e, "Session recovery failed, continuing offline");
                Ok(None)
            }
        }
    }

    /// Drops the local session and timer, then forgets the user.
    pub async fn logout(&self) -> SyncResult<()> {
        self.store.delete_session().await?;
        self.timer.reset().await?;
        self.store.set_user(None).await?;
        info!("Signed out");
        Ok(())
    }
}
