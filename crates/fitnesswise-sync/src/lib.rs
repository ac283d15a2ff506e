//! # fitnesswise-sync: Session Persistence & Replication for FitnessWise
//!
//! This crate owns the live workout session on the client. Every mutation is
//! written to local SQLite before it returns; a background scheduler
//! replicates the session to the REST API and retries failed upserts a
//! bounded number of times.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Tracker (runtime.rs)                            │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                 WorkoutController (intents.rs)                   │  │
//! │  │   clamp exercise index • reject negative reps • timer intents    │  │
//! │  └───────────────┬──────────────────────────────┬───────────────────┘  │
//! │                  ▼                              ▼                       │
//! │  ┌────────────────────────────┐   ┌──────────────────────────────┐     │
//! │  │   SessionStore (store.rs)  │◄──│  TimerService                │     │
//! │  │                            │   │  (timer_service.rs)          │     │
//! │  │ one live session           │   │  wall-clock accounting,      │     │
//! │  │ local write per mutation   │   │  timer-state slot            │     │
//! │  │ EventBus notifications     │   └──────────────────────────────┘     │
//! │  └──────────────┬─────────────┘                                        │
//! │                 │ persist_local                                        │
//! │  ┌──────────────▼─────────────┐   ┌──────────────────────────────┐     │
//! │  │   AutoSaver (autosave.rs)  │──►│  RetryQueue (retry.rs)       │     │
//! │  │ 30s ticks, one in flight   │   │  5s, 10s, 20s then dropped   │     │
//! │  └──────────────┬─────────────┘   └──────────────────────────────┘     │
//! │                 │ RemoteApi                                            │
//! │  ┌──────────────▼─────────────┐                                        │
//! │  │   HttpRemote (remote.rs)   │──► POST /api/sessions ...              │
//! │  └────────────────────────────┘                                        │
//! │                                                                         │
//! │  SAVE STATUS: Ready → Saving → Saved → Ready | Error → Failed          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`store`] - `SessionStore`, sole owner of the live session
//! - [`autosave`] - Periodic local save + remote replication
//! - [`retry`] - Bounded retry queue for failed upserts
//! - [`timer_service`] - Persisted workout timer
//! - [`intents`] - `WorkoutController`, the caller boundary
//! - [`remote`] - `RemoteApi` seam and its reqwest implementation
//! - [`events`] - Typed session events
//! - [`runtime`] - `Tracker` startup/shutdown
//! - [`config`] - `tracker.toml` + environment overrides
//! - [`clock`] - Injectable wall clock
//! - [`error`] - Sync error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fitnesswise_core::WorkoutProgram;
//! use fitnesswise_sync::{init_tracing, Tracker, TrackerConfig};
//!
//! init_tracing();
//! let tracker = Tracker::start(TrackerConfig::load_or_default(None)).await?;
//!
//! let workouts = tracker.controller();
//! workouts.start_workout(WorkoutProgram::A).await?;
//! workouts.increment_reps(0, 0).await?;
//! workouts.start_timer().await?;
//!
//! tracker.shutdown().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod autosave;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod intents;
pub mod remote;
pub mod retry;
pub mod runtime;
pub mod store;
pub mod timer_service;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use autosave::{AutoSaveHandle, AutoSaver, SessionSource, TickOutcome};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AutoSaveOptions, TrackerConfig};
pub use error::{SyncError, SyncResult};
pub use events::{EventBus, LoggingListener, SessionEvent, SessionListener};
pub use intents::WorkoutController;
pub use remote::{HttpRemote, RemoteApi};
pub use retry::{RetryEntry, RetryPolicy, RetryQueue, RetryVerdict};
pub use runtime::{init_tracing, Tracker};
pub use store::{CompletedSession, SessionStore};
pub use timer_service::{TickerHandle, TimerService};
