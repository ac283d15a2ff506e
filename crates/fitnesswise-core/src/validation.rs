//! # Validation Module
//!
//! Input validation for intents (client side) and insert payloads (server
//! side).
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: Intent layer (fitnesswise-sync::intents)                     │
//! │  ├── validate_rep_count before anything reaches the SessionStore       │
//! │  └── exercise index clamping                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: REST handlers (apps/api)                                     │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── THIS MODULE: payload rules → 400 { "error": ... }                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Storage uniqueness (email, firebaseUid) → 409                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::api::{ExerciseUpdate, NewExercise, NewUser, NewWorkout, UserUpdate, WorkoutUpdate};
use crate::error::ValidationError;
use crate::session::SetProgress;
use crate::{MAX_REPS_PER_SET, MAX_USERNAME_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a rep count coming from user input.
///
/// The session store takes whatever it is given, so this is where negative
/// or absurd values stop.
///
/// ## Example
/// ```rust
/// use fitnesswise_core::validation::validate_rep_count;
///
/// assert_eq!(validate_rep_count(8).unwrap(), 8);
/// assert!(validate_rep_count(-1).is_err());
/// ```
pub fn validate_rep_count(reps: i64) -> ValidationResult<u32> {
    if reps < 0 {
        return Err(ValidationError::negative("completedReps"));
    }
    if reps > MAX_REPS_PER_SET as i64 {
        return Err(ValidationError::OutOfRange {
            field: "completedReps".into(),
            min: 0,
            max: MAX_REPS_PER_SET as i64,
        });
    }
    Ok(reps as u32)
}

fn validate_non_negative(field: &str, value: Option<i64>) -> ValidationResult<()> {
    match value {
        Some(v) if v < 0 => Err(ValidationError::negative(field)),
        _ => Ok(()),
    }
}

fn validate_sets(sets: &[SetProgress]) -> ValidationResult<()> {
    for set in sets {
        if set.target_reps > MAX_REPS_PER_SET || set.completed_reps > MAX_REPS_PER_SET {
            return Err(ValidationError::OutOfRange {
                field: "sets".into(),
                min: 0,
                max: MAX_REPS_PER_SET as i64,
            });
        }
    }
    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates an email address (shape only).
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::required("email"));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ValidationError::invalid_format("email", "expected name@domain")),
    }
}

/// Validates a display name.
pub fn validate_username(username: &str) -> ValidationResult<()> {
    let username = username.trim();
    if username.is_empty() {
        return Err(ValidationError::required("username"));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(ValidationError::TooLong {
            field: "username".into(),
            max: MAX_USERNAME_LEN,
        });
    }
    Ok(())
}

// =============================================================================
// Payload Validators
// =============================================================================

pub fn validate_new_user(user: &NewUser) -> ValidationResult<()> {
    validate_email(&user.email)?;
    if user.firebase_uid.trim().is_empty() {
        return Err(ValidationError::required("firebaseUid"));
    }
    validate_username(&user.username)
}

pub fn validate_user_update(update: &UserUpdate) -> ValidationResult<()> {
    if let Some(email) = &update.email {
        validate_email(email)?;
    }
    if let Some(username) = &update.username {
        validate_username(username)?;
    }
    validate_non_negative("currentStreak", update.current_streak)?;
    validate_non_negative("totalWorkouts", update.total_workouts)
}

/// Validates a workout insert.
///
/// ## Rules
/// - `duration` is non-negative seconds
/// - `endTime`, when present, is not before `startTime`
pub fn validate_new_workout(workout: &NewWorkout) -> ValidationResult<()> {
    validate_non_negative("duration", workout.duration)?;
    if let Some(end) = workout.end_time {
        if end < workout.start_time {
            return Err(ValidationError::invalid_format(
                "endTime",
                "must not be earlier than startTime",
            ));
        }
    }
    Ok(())
}

pub fn validate_workout_update(update: &WorkoutUpdate) -> ValidationResult<()> {
    validate_non_negative("duration", update.duration)
}

pub fn validate_new_exercise(exercise: &NewExercise) -> ValidationResult<()> {
    if exercise.name.trim().is_empty() {
        return Err(ValidationError::required("name"));
    }
    if exercise.order < 0 {
        return Err(ValidationError::negative("order"));
    }
    validate_sets(&exercise.sets)
}

pub fn validate_exercise_update(update: &ExerciseUpdate) -> ValidationResult<()> {
    match &update.sets {
        Some(sets) => validate_sets(sets),
        None => Ok(()),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::WorkoutProgram;
    use chrono::{Duration, Utc};

    #[test]
    fn test_rep_count() {
        assert_eq!(validate_rep_count(0).unwrap(), 0);
        assert_eq!(validate_rep_count(12).unwrap(), 12);
        assert!(matches!(
            validate_rep_count(-3),
            Err(ValidationError::Negative { .. })
        ));
        assert!(matches!(
            validate_rep_count(1000),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_email() {
        assert!(validate_email("lifter@example.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("a@localhost").is_err());
    }

    #[test]
    fn test_new_user() {
        let mut user = NewUser {
            email: "lifter@example.com".into(),
            firebase_uid: "fb-123".into(),
            username: "lifter".into(),
        };
        assert!(validate_new_user(&user).is_ok());

        user.firebase_uid = "  ".into();
        assert!(matches!(
            validate_new_user(&user),
            Err(ValidationError::Required { .. })
        ));

        user.firebase_uid = "fb-123".into();
        user.username = "x".repeat(MAX_USERNAME_LEN + 1);
        assert!(matches!(
            validate_new_user(&user),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_user_update_rejects_negative_counters() {
        let update = UserUpdate {
            total_workouts: Some(-1),
            ..Default::default()
        };
        assert!(validate_user_update(&update).is_err());
        assert!(validate_user_update(&UserUpdate::default()).is_ok());
    }

    #[test]
    fn test_new_workout_time_order() {
        let start = Utc::now();
        let mut workout = NewWorkout {
            user_id: 1,
            workout_day: WorkoutProgram::A,
            start_time: start,
            end_time: Some(start + Duration::minutes(40)),
            duration: Some(2400),
            completed: true,
            notes: None,
        };
        assert!(validate_new_workout(&workout).is_ok());

        workout.end_time = Some(start - Duration::minutes(1));
        assert!(validate_new_workout(&workout).is_err());

        workout.end_time = None;
        workout.duration = Some(-5);
        assert!(validate_new_workout(&workout).is_err());
    }

    #[test]
    fn test_new_exercise() {
        let mut exercise = NewExercise {
            workout_id: 1,
            name: "Face Pulls".into(),
            sets: vec![SetProgress::new(20)],
            completed: false,
            order: 3,
        };
        assert!(validate_new_exercise(&exercise).is_ok());

        exercise.order = -1;
        assert!(validate_new_exercise(&exercise).is_err());

        exercise.order = 0;
        exercise.name = String::new();
        assert!(validate_new_exercise(&exercise).is_err());
    }
}
