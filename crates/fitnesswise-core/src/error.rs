//! # Error Types
//!
//! Domain-specific error types for fitnesswise-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  fitnesswise-core errors (this file)                                   │
//! │  ├── CoreError        - General domain errors                          │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  fitnesswise-db errors (separate crate)                                │
//! │  └── DbError          - Local storage failures                         │
//! │                                                                         │
//! │  fitnesswise-sync errors                                               │
//! │  └── SyncError        - Store, replication and config failures         │
//! │                                                                         │
//! │  apps/api errors                                                        │
//! │  └── ApiError         - What HTTP clients see ({ "error": ... })       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core workout logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Program code is not one of A, B or C.
    ///
    /// ## When This Occurs
    /// - A stored history row was written by a newer build
    /// - A client sends `workoutDay: "D"`
    #[error("Unknown workout program: {0}")]
    UnknownProgram(String),

    /// A session was expected but none is live.
    #[error("No live workout session")]
    NoLiveSession,

    /// Session snapshot is structurally invalid.
    ///
    /// ## When This Occurs
    /// - `currentExerciseIndex` points past the exercise list
    /// - A session with zero exercises is uploaded
    #[error("Invalid session: {0}")]
    InvalidSession(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any state changes, so a rejected input never reaches the
/// session store or the in-memory API tables.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Field format is invalid (e.g., email without '@').
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Creates a Required error.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Creates a Negative error.
    pub fn negative(field: impl Into<String>) -> Self {
        ValidationError::Negative {
            field: field.into(),
        }
    }

    /// Creates an InvalidFormat error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
