//! # In-Memory Storage
//!
//! Four tables behind one lock, with serial ids. Lookups other than by
//! primary key are linear scans; the data set is one user's worth of rows.
//!
//! ```text
//! Tables
//! ├── users       id → User          (email, firebaseUid unique)
//! ├── workouts    id → WorkoutRecord
//! ├── exercises   id → ExerciseRecord
//! └── sessions    id → StoredSession (at most one per user)
//! ```
//!
//! Nothing is persisted; a restart empties every table.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use fitnesswise_core::{
    ExerciseRecord, ExerciseUpdate, NewExercise, NewUser, NewWorkout, StoredSession, User,
    UserUpdate, WorkoutRecord, WorkoutSession, WorkoutUpdate,
};

// =============================================================================
// Errors
// =============================================================================

/// Storage failures.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("{field} '{value}' is already registered")]
    Duplicate { field: String, value: String },
}

impl StorageError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StorageError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// Tables
// =============================================================================

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<i64, User>,
    workouts: HashMap<i64, WorkoutRecord>,
    exercises: HashMap<i64, ExerciseRecord>,
    sessions: HashMap<i64, StoredSession>,
    next_user_id: i64,
    next_workout_id: i64,
    next_exercise_id: i64,
    next_session_id: i64,
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

/// Thread-safe in-memory storage.
#[derive(Debug, Default)]
pub struct MemStorage {
    tables: RwLock<Tables>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Users
    // =========================================================================

    pub async fn get_user(&self, id: i64) -> StorageResult<User> {
        let tables = self.tables.read().await;
        tables
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("User", id))
    }

    pub async fn get_user_by_firebase_uid(&self, uid: &str) -> StorageResult<User> {
        let tables = self.tables.read().await;
        tables
            .users
            .values()
            .find(|u| u.firebase_uid == uid)
            .cloned()
            .ok_or_else(|| StorageError::not_found("User", uid))
    }

    /// Inserts a user. Email and identity uid must be unused.
    pub async fn create_user(&self, new: NewUser) -> StorageResult<User> {
        let mut tables = self.tables.write().await;

        let email = new.email.trim().to_lowercase();
        if tables.users.values().any(|u| u.email == email) {
            return Err(StorageError::Duplicate {
                field: "email".into(),
                value: email,
            });
        }
        if tables.users.values().any(|u| u.firebase_uid == new.firebase_uid) {
            return Err(StorageError::Duplicate {
                field: "firebaseUid".into(),
                value: new.firebase_uid,
            });
        }

        let id = next_id(&mut tables.next_user_id);
        let user = User {
            id,
            email,
            firebase_uid: new.firebase_uid,
            username: new.username.trim().to_string(),
            current_streak: 0,
            total_workouts: 0,
            created_at: Utc::now(),
        };
        tables.users.insert(id, user.clone());

        debug!(user_id = id, "User created");
        Ok(user)
    }

    pub async fn update_user(&self, id: i64, update: UserUpdate) -> StorageResult<User> {
        let mut tables = self.tables.write().await;

        if let Some(email) = &update.email {
            let email = email.trim().to_lowercase();
            if tables.users.values().any(|u| u.id != id && u.email == email) {
                return Err(StorageError::Duplicate {
                    field: "email".into(),
                    value: email,
                });
            }
        }

        let user = tables
            .users
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found("User", id))?;

        if let Some(email) = update.email {
            user.email = email.trim().to_lowercase();
        }
        if let Some(username) = update.username {
            user.username = username.trim().to_string();
        }
        if let Some(streak) = update.current_streak {
            user.current_streak = streak;
        }
        if let Some(total) = update.total_workouts {
            user.total_workouts = total;
        }

        Ok(user.clone())
    }

    // =========================================================================
    // Workouts
    // =========================================================================

    pub async fn create_workout(&self, new: NewWorkout) -> StorageResult<WorkoutRecord> {
        let mut tables = self.tables.write().await;

        let id = next_id(&mut tables.next_workout_id);
        let workout = WorkoutRecord {
            id,
            user_id: new.user_id,
            workout_day: new.workout_day,
            start_time: new.start_time,
            end_time: new.end_time,
            duration: new.duration,
            completed: new.completed,
            notes: new.notes,
            created_at: Utc::now(),
        };
        tables.workouts.insert(id, workout.clone());

        debug!(workout_id = id, user_id = new.user_id, "Workout recorded");
        Ok(workout)
    }

    /// A user's workouts, oldest first.
    pub async fn workouts_for_user(&self, user_id: i64) -> Vec<WorkoutRecord> {
        let tables = self.tables.read().await;
        let mut workouts: Vec<WorkoutRecord> = tables
            .workouts
            .values()
            .filter(|w| w.user_id == user_id)
            .cloned()
            .collect();
        workouts.sort_by_key(|w| w.id);
        workouts
    }

    pub async fn update_workout(
        &self,
        id: i64,
        update: WorkoutUpdate,
    ) -> StorageResult<WorkoutRecord> {
        let mut tables = self.tables.write().await;
        let workout = tables
            .workouts
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found("Workout", id))?;

        if let Some(end) = update.end_time {
            workout.end_time = Some(end);
        }
        if let Some(duration) = update.duration {
            workout.duration = Some(duration);
        }
        if let Some(completed) = update.completed {
            workout.completed = completed;
        }
        if let Some(notes) = update.notes {
            workout.notes = Some(notes);
        }

        Ok(workout.clone())
    }

    // =========================================================================
    // Exercises
    // =========================================================================

    pub async fn create_exercise(&self, new: NewExercise) -> StorageResult<ExerciseRecord> {
        let mut tables = self.tables.write().await;

        let id = next_id(&mut tables.next_exercise_id);
        let exercise = ExerciseRecord {
            id,
            workout_id: new.workout_id,
            name: new.name,
            sets: new.sets,
            completed: new.completed,
            order: new.order,
        };
        tables.exercises.insert(id, exercise.clone());
        Ok(exercise)
    }

    /// A workout's exercises in display order.
    pub async fn exercises_for_workout(&self, workout_id: i64) -> Vec<ExerciseRecord> {
        let tables = self.tables.read().await;
        let mut exercises: Vec<ExerciseRecord> = tables
            .exercises
            .values()
            .filter(|e| e.workout_id == workout_id)
            .cloned()
            .collect();
        exercises.sort_by_key(|e| (e.order, e.id));
        exercises
    }

    pub async fn update_exercise(
        &self,
        id: i64,
        update: ExerciseUpdate,
    ) -> StorageResult<ExerciseRecord> {
        let mut tables = self.tables.write().await;
        let exercise = tables
            .exercises
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found("Exercise", id))?;

        if let Some(sets) = update.sets {
            exercise.sets = sets;
        }
        if let Some(completed) = update.completed {
            exercise.completed = completed;
        }

        Ok(exercise.clone())
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Replaces the user's session row, creating it on first save.
    pub async fn save_session(&self, user_id: i64, data: WorkoutSession) -> StoredSession {
        let mut tables = self.tables.write().await;
        let now = Utc::now();

        let existing = tables
            .sessions
            .values()
            .find(|s| s.user_id == user_id)
            .map(|s| s.id);

        let id = match existing {
            Some(id) => id,
            None => next_id(&mut tables.next_session_id),
        };

        let stored = StoredSession {
            id,
            user_id,
            session_data: data,
            last_saved: now,
        };
        tables.sessions.insert(id, stored.clone());

        debug!(session_id = id, user_id, replaced = existing.is_some(), "Session saved");
        stored
    }

    pub async fn session_for_user(&self, user_id: i64) -> StorageResult<StoredSession> {
        let tables = self.tables.read().await;
        tables
            .sessions
            .values()
            .find(|s| s.user_id == user_id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("Session", user_id))
    }

    /// Removes the user's session row. Returns true if one existed.
    pub async fn delete_session(&self, user_id: i64) -> bool {
        let mut tables = self.tables.write().await;
        let before = tables.sessions.len();
        tables.sessions.retain(|_, s| s.user_id != user_id);
        tables.sessions.len() != before
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use fitnesswise_core::{ProgramTemplate, SetProgress, WorkoutProgram};

    fn new_user(email: &str, uid: &str) -> NewUser {
        NewUser {
            email: email.into(),
            firebase_uid: uid.into(),
            username: "lifter".into(),
        }
    }

    fn session(program: WorkoutProgram) -> WorkoutSession {
        let template = ProgramTemplate::for_program(program);
        WorkoutSession::start(program, &template.exercises, Utc::now(), Some(1))
    }

    #[tokio::test]
    async fn test_user_ids_are_serial_and_lookups_work() {
        let storage = MemStorage::new();
        let a = storage.create_user(new_user("a@x.io", "uid-a")).await.unwrap();
        let b = storage.create_user(new_user("b@x.io", "uid-b")).await.unwrap();

        assert_eq!((a.id, b.id), (1, 2));
        assert_eq!(a.total_workouts, 0);
        assert_eq!(storage.get_user_by_firebase_uid("uid-b").await.unwrap().id, 2);
        assert!(matches!(
            storage.get_user(3).await,
            Err(StorageError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_duplicate_identity_rejected() {
        let storage = MemStorage::new();
        storage.create_user(new_user("a@x.io", "uid-a")).await.unwrap();

        let dup_email = storage.create_user(new_user("A@X.io", "uid-z")).await;
        assert!(matches!(dup_email, Err(StorageError::Duplicate { .. })));

        let dup_uid = storage.create_user(new_user("c@x.io", "uid-a")).await;
        assert!(matches!(dup_uid, Err(StorageError::Duplicate { .. })));
    }

    #[tokio::test]
    async fn test_partial_user_update() {
        let storage = MemStorage::new();
        let user = storage.create_user(new_user("a@x.io", "uid-a")).await.unwrap();

        let updated = storage
            .update_user(
                user.id,
                UserUpdate {
                    total_workouts: Some(1),
                    current_streak: Some(1),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.total_workouts, 1);
        assert_eq!(updated.current_streak, 1);
        assert_eq!(updated.username, "lifter");
        assert!(storage.update_user(99, UserUpdate::default()).await.is_err());
    }

    #[tokio::test]
    async fn test_session_upsert_replaces_single_row() {
        let storage = MemStorage::new();

        let first = storage.save_session(1, session(WorkoutProgram::A)).await;
        let second = storage.save_session(1, session(WorkoutProgram::B)).await;
        storage.save_session(2, session(WorkoutProgram::C)).await;

        assert_eq!(first.id, second.id);
        let stored = storage.session_for_user(1).await.unwrap();
        assert_eq!(stored.session_data.program, WorkoutProgram::B);

        assert!(storage.delete_session(1).await);
        assert!(!storage.delete_session(1).await);
        assert!(storage.session_for_user(1).await.is_err());
        assert!(storage.session_for_user(2).await.is_ok());
    }

    #[tokio::test]
    async fn test_exercises_sorted_by_order() {
        let storage = MemStorage::new();
        for (name, order) in [("Face Pulls", 3), ("Barbell Rows", 0), ("T-Bar Rows", 1)] {
            storage
                .create_exercise(NewExercise {
                    workout_id: 7,
                    name: name.into(),
                    sets: vec![SetProgress::new(10)],
                    completed: false,
                    order,
                })
                .await
                .unwrap();
        }

        let names: Vec<String> = storage
            .exercises_for_workout(7)
            .await
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["Barbell Rows", "T-Bar Rows", "Face Pulls"]);
        assert!(storage.exercises_for_workout(8).await.is_empty());
    }
}
