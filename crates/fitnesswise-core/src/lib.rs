//! # fitnesswise-core: Pure Workout Logic for FitnessWise
//!
//! Everything in this crate is deterministic: no clock reads, no storage, no
//! network. Callers pass `now` in explicitly, which is what lets the session
//! store and the timer be tested against a manual clock.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       FitnessWise Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  PWA (presentation, external)                   │   │
//! │  │     Program picker ──► Set tracker ──► Timer ──► Complete       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ intents                                │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │        fitnesswise-sync (SessionStore, AutoSaver, Timer)        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            ★ fitnesswise-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  program  │  │  session  │  │   timer   │  │    api    │  │   │
//! │  │   │ templates │  │ progress  │  │ accounting│  │ wire DTOs │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO CLOCK • NO NETWORK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`program`] - Static A/B/C program templates
//! - [`session`] - Live session, exercise and set progress
//! - [`timer`] - Wall-clock based workout timer
//! - [`api`] - Types exchanged with the REST API
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::Utc;
//! use fitnesswise_core::{ProgramTemplate, WorkoutProgram, WorkoutSession};
//!
//! let template = ProgramTemplate::for_program(WorkoutProgram::A);
//! let session = WorkoutSession::start(WorkoutProgram::A, &template.exercises, Utc::now(), None);
//!
//! assert_eq!(session.exercises.len(), 4);
//! assert!(session.exercises.iter().all(|e| e.sets.len() == 3));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod api;
pub mod error;
pub mod program;
pub mod session;
pub mod timer;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use api::*;
pub use error::{CoreError, CoreResult, ValidationError};
pub use program::{ExerciseTemplate, ProgramTemplate, WorkoutProgram};
pub use session::{
    ArchivedWorkout, ExerciseProgress, SaveStatus, SetProgress, TimerState, WorkoutSession,
};
pub use timer::{format_elapsed, Timer, TimerPhase};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Upper bound for a single rep count entry.
///
/// Nobody logs a thousand pull-ups in one set; anything above this is a
/// fat-fingered input.
pub const MAX_REPS_PER_SET: u32 = 999;

/// Maximum username length accepted by the API.
pub const MAX_USERNAME_LEN: usize = 100;
