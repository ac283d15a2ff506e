//! # API Wire Types
//!
//! Request and response bodies of the REST API, shared by the server
//! (`apps/api`) and the replication client (`fitnesswise-sync`). Field names
//! are camelCase on the wire.
//!
//! ## Endpoint Map
//! ```text
//! POST   /api/users                    NewUser          → User
//! GET    /api/users/{id}                                → User
//! GET    /api/users/firebase/{uid}                      → User
//! PATCH  /api/users/{id}               UserUpdate       → User
//! POST   /api/workouts                 NewWorkout       → WorkoutRecord
//! GET    /api/workouts/user/{userId}                    → [WorkoutRecord]
//! PATCH  /api/workouts/{id}            WorkoutUpdate    → WorkoutRecord
//! POST   /api/exercises                NewExercise      → ExerciseRecord
//! GET    /api/exercises/workout/{id}                    → [ExerciseRecord]
//! PATCH  /api/exercises/{id}           ExerciseUpdate   → ExerciseRecord
//! POST   /api/sessions                 SaveSessionRequest → StoredSession
//! GET    /api/sessions/user/{userId}                    → StoredSession
//! DELETE /api/sessions/user/{userId}                    → DeleteResponse
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::program::WorkoutProgram;
use crate::session::{ArchivedWorkout, SetProgress, WorkoutSession};

// =============================================================================
// Users
// =============================================================================

/// A user row. `firebase_uid` is the opaque identity-provider reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub firebase_uid: String,
    pub username: String,
    pub current_streak: i64,
    pub total_workouts: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /users`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewUser {
    pub email: String,
    pub firebase_uid: String,
    pub username: String,
}

/// Body of `PATCH /users/{id}`. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_streak: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_workouts: Option<i64>,
}

impl UserUpdate {
    /// Counter bump sent after a workout is completed.
    pub fn workout_completed(user: &User) -> Self {
        UserUpdate {
            total_workouts: Some(user.total_workouts + 1),
            current_streak: Some(user.current_streak + 1),
            ..Default::default()
        }
    }
}

// =============================================================================
// Workouts
// =============================================================================

/// A recorded workout row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct WorkoutRecord {
    pub id: i64,
    pub user_id: i64,
    pub workout_day: WorkoutProgram,
    #[ts(as = "String")]
    pub start_time: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub end_time: Option<DateTime<Utc>>,
    /// Seconds.
    pub duration: Option<i64>,
    pub completed: bool,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /workouts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewWorkout {
    pub user_id: i64,
    pub workout_day: WorkoutProgram,
    #[ts(as = "String")]
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl NewWorkout {
    /// The "workout completed" record for an archived session.
    pub fn from_archived(user_id: i64, archived: &ArchivedWorkout) -> Self {
        NewWorkout {
            user_id,
            workout_day: archived.session.program,
            start_time: archived.session.started_at,
            end_time: Some(archived.completed_at),
            duration: Some(archived.duration_secs),
            completed: true,
            notes: None,
        }
    }
}

/// Body of `PATCH /workouts/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct WorkoutUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

// =============================================================================
// Exercises
// =============================================================================

/// A recorded exercise row belonging to a workout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ExerciseRecord {
    pub id: i64,
    pub workout_id: i64,
    pub name: String,
    pub sets: Vec<SetProgress>,
    pub completed: bool,
    pub order: i32,
}

/// Body of `POST /exercises`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewExercise {
    pub workout_id: i64,
    pub name: String,
    pub sets: Vec<SetProgress>,
    #[serde(default)]
    pub completed: bool,
    pub order: i32,
}

/// Body of `PATCH /exercises/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ExerciseUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sets: Option<Vec<SetProgress>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

// =============================================================================
// Sessions
// =============================================================================

/// The one replicated session row per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StoredSession {
    pub id: i64,
    pub user_id: i64,
    pub session_data: WorkoutSession,
    #[ts(as = "String")]
    pub last_saved: DateTime<Utc>,
}

/// Body of `POST /sessions`. Replaces the user's row wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaveSessionRequest {
    pub user_id: i64,
    pub session_data: WorkoutSession,
}

// =============================================================================
// Envelopes
// =============================================================================

/// Error body returned with every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ErrorBody {
    pub error: String,
}

/// Body of `DELETE /sessions/user/{userId}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DeleteResponse {
    pub success: bool,
}
