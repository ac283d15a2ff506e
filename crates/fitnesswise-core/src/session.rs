//! # Workout Session
//!
//! The live session and its progress records.
//!
//! ## Session Shape
//! ```text
//! WorkoutSession
//! ├── program               A | B | C
//! ├── currentExerciseIndex  0 ≤ i < exercises.len()
//! ├── timerState            { running, elapsedMs, startEpoch? }
//! ├── exercises[]           deep copy of the program template
//! │   └── sets[]            { targetReps, completedReps, completed }
//! ├── startedAt
//! ├── lastUpdated           never moves backwards
//! └── ownerUserId?          absent until an identity is associated
//! ```
//!
//! `completed` on a set is a separate user action; it is never derived from
//! `completedReps`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::program::{ExerciseTemplate, WorkoutProgram};

// =============================================================================
// Set / Exercise Progress
// =============================================================================

/// Progress for one set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SetProgress {
    /// Fixed at session start.
    pub target_reps: u32,
    pub completed_reps: u32,
    pub completed: bool,
}

impl SetProgress {
    /// A fresh set with nothing logged.
    pub fn new(target_reps: u32) -> Self {
        SetProgress {
            target_reps,
            completed_reps: 0,
            completed: false,
        }
    }
}

/// Progress for one exercise in the live session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ExerciseProgress {
    pub name: String,
    pub description: String,
    pub equipment: String,
    pub muscle_groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    pub sets: Vec<SetProgress>,
}

impl ExerciseProgress {
    /// Materializes an exercise from its template with all sets zeroed.
    pub fn from_template(template: &ExerciseTemplate) -> Self {
        ExerciseProgress {
            name: template.name.clone(),
            description: template.description.clone(),
            equipment: template.equipment.clone(),
            muscle_groups: template.muscle_groups.clone(),
            video_url: template.video_url.clone(),
            sets: template.target_reps.iter().copied().map(SetProgress::new).collect(),
        }
    }

    /// True once every set has been marked complete.
    pub fn is_complete(&self) -> bool {
        !self.sets.is_empty() && self.sets.iter().all(|s| s.completed)
    }
}

// =============================================================================
// Timer State
// =============================================================================

/// Serializable timer snapshot stored inside the session.
///
/// When `running` is true, `start_epoch` is the wall-clock instant at which
/// the timer would have started had it never been paused, so elapsed time
/// can be recomputed as `now - start_epoch` after any suspension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TimerState {
    pub running: bool,
    pub elapsed_ms: u64,
    #[ts(as = "Option<String>")]
    pub start_epoch: Option<DateTime<Utc>>,
}

// =============================================================================
// Workout Session
// =============================================================================

/// The single live workout session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct WorkoutSession {
    pub program: WorkoutProgram,
    pub current_exercise_index: usize,
    pub timer_state: TimerState,
    pub exercises: Vec<ExerciseProgress>,
    #[ts(as = "String")]
    pub started_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub owner_user_id: Option<i64>,
}

impl WorkoutSession {
    /// Starts a new session from a template list.
    ///
    /// The exercises are deep-copied; mutating the session never touches
    /// the template.
    pub fn start(
        program: WorkoutProgram,
        templates: &[ExerciseTemplate],
        now: DateTime<Utc>,
        owner_user_id: Option<i64>,
    ) -> Self {
        WorkoutSession {
            program,
            current_exercise_index: 0,
            timer_state: TimerState::default(),
            exercises: templates.iter().map(ExerciseProgress::from_template).collect(),
            started_at: now,
            last_updated: now,
            owner_user_id,
        }
    }

    /// Bumps `last_updated`, never moving it backwards.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.last_updated {
            self.last_updated = now;
        }
    }

    /// Returns a set if both indices are in range.
    pub fn set(&self, exercise_index: usize, set_index: usize) -> Option<&SetProgress> {
        self.exercises.get(exercise_index)?.sets.get(set_index)
    }

    /// Mutable access to a set if both indices are in range.
    pub fn set_mut(&mut self, exercise_index: usize, set_index: usize) -> Option<&mut SetProgress> {
        self.exercises.get_mut(exercise_index)?.sets.get_mut(set_index)
    }

    /// The exercise the user is currently on.
    pub fn current_exercise(&self) -> Option<&ExerciseProgress> {
        self.exercises.get(self.current_exercise_index)
    }

    /// Clamps an arbitrary (possibly negative) index into the exercise range.
    pub fn clamp_exercise_index(&self, index: i64) -> usize {
        let last = self.exercises.len().saturating_sub(1) as i64;
        index.clamp(0, last) as usize
    }

    /// Number of sets marked complete.
    pub fn completed_sets(&self) -> usize {
        self.exercises
            .iter()
            .flat_map(|e| e.sets.iter())
            .filter(|s| s.completed)
            .count()
    }

    /// Number of sets in the session.
    pub fn total_sets(&self) -> usize {
        self.exercises.iter().map(|e| e.sets.len()).sum()
    }

    /// Structural checks applied to snapshots arriving from outside.
    pub fn validate(&self) -> CoreResult<()> {
        if self.exercises.is_empty() {
            return Err(CoreError::InvalidSession("session has no exercises".into()));
        }
        if self.current_exercise_index >= self.exercises.len() {
            return Err(CoreError::InvalidSession(format!(
                "currentExerciseIndex {} out of range (0..{})",
                self.current_exercise_index,
                self.exercises.len()
            )));
        }
        if self.last_updated < self.started_at {
            return Err(CoreError::InvalidSession(
                "lastUpdated is earlier than startedAt".into(),
            ));
        }
        Ok(())
    }

    /// Consumes the session into a history record.
    pub fn archive(self, completed_at: DateTime<Utc>) -> ArchivedWorkout {
        let duration_secs = (completed_at - self.started_at).num_seconds().max(0);
        ArchivedWorkout {
            id: Uuid::new_v4(),
            session: self,
            completed_at,
            duration_secs,
        }
    }
}

// =============================================================================
// Archived Workout
// =============================================================================

/// A completed session as stored in the local history log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ArchivedWorkout {
    #[ts(as = "String")]
    pub id: Uuid,
    pub session: WorkoutSession,
    #[ts(as = "String")]
    pub completed_at: DateTime<Utc>,
    pub duration_secs: i64,
}

// =============================================================================
// Save Status
// =============================================================================

/// User-visible replication status.
///
/// ```text
/// Ready ──► Saving ──┬──► Saved ──(2s)──► Ready
///                    ├──► Error ──(retry ok)──► Saved
///                    └──► Error ──(3 failures)──► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum SaveStatus {
    #[default]
    Ready,
    Saving,
    Saved,
    Error,
    Failed,
}

impl SaveStatus {
    /// Indicator text shown next to the session header.
    pub fn label(&self) -> &'static str {
        match self {
            SaveStatus::Ready => "Ready",
            SaveStatus::Saving => "Saving...",
            SaveStatus::Saved => "Saved",
            SaveStatus::Error => "Error",
            SaveStatus::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Tests
// =============================================================================
