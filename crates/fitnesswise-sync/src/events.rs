//! # Session Events
//!
//! Typed notifications from the session store and the auto-saver.
//!
//! ```text
//! SessionStore / AutoSaver ──► EventBus::emit(event)
//!                                  │
//!                   ┌──────────────┼───────────────────┐
//!                   ▼              ▼                   ▼
//!             listener #1     listener #2      broadcast::Sender
//!             (Ok)            (Err → warn!)    (UI subscribers)
//! ```
//!
//! A failing listener is logged and skipped; the remaining listeners and the
//! broadcast channel still see the event.

use std::sync::{Arc, RwLock};

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use fitnesswise_core::{SaveStatus, TimerState, WorkoutProgram};

/// Capacity of the broadcast channel. Slow subscribers see `Lagged`.
const BROADCAST_CAPACITY: usize = 64;

/// Everything observers can be told about.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SessionEvent {
    SessionStarted {
        program: WorkoutProgram,
    },
    /// A live session was restored at startup or adopted from the server.
    SessionLoaded {
        program: WorkoutProgram,
    },
    SetUpdated {
        exercise_index: usize,
        set_index: usize,
        completed_reps: u32,
    },
    SetCompleted {
        exercise_index: usize,
        set_index: usize,
        completed: bool,
    },
    ExerciseChanged {
        index: usize,
    },
    TimerUpdated {
        state: TimerState,
    },
    SessionCompleted {
        id: Uuid,
        program: WorkoutProgram,
        duration_secs: i64,
    },
    SessionDeleted,
    UserChanged {
        user_id: Option<i64>,
    },
    SaveStatusChanged {
        status: SaveStatus,
    },
}

impl SessionEvent {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::SessionStarted { .. } => "session-started",
            SessionEvent::SessionLoaded { .. } => "session-loaded",
            SessionEvent::SetUpdated { .. } => "set-updated",
            SessionEvent::SetCompleted { .. } => "set-completed",
            SessionEvent::ExerciseChanged { .. } => "exercise-changed",
            SessionEvent::TimerUpdated { .. } => "timer-updated",
            SessionEvent::SessionCompleted { .. } => "session-completed",
            SessionEvent::SessionDeleted => "session-deleted",
            SessionEvent::UserChanged { .. } => "user-changed",
            SessionEvent::SaveStatusChanged { .. } => "save-status-changed",
        }
    }
}

/// Observer of session events (implemented by the presentation layer).
pub trait SessionListener: Send + Sync {
    fn on_event(&self, event: &SessionEvent) -> Result<(), String>;
}

/// Listener that writes every event to the debug log.
pub struct LoggingListener;

impl SessionListener for LoggingListener {
    fn on_event(&self, event: &SessionEvent) -> Result<(), String> {
        debug!(event = event.name(), ?event, "Session event");
        Ok(())
    }
}

/// Fan-out of session events to listeners and broadcast subscribers.
pub struct EventBus {
    listeners: RwLock<Vec<Arc<dyn SessionListener>>>,
    tx: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        EventBus {
            listeners: RwLock::new(Vec::new()),
            tx,
        }
    }

    pub fn add_listener(&self, listener: Arc<dyn SessionListener>) {
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(listener);
    }

    /// A receiver for every event emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Delivers `event` to every listener, then to broadcast subscribers.
    pub fn emit(&self, event: SessionEvent) {
        let listeners: Vec<Arc<dyn SessionListener>> = self
            .listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        for listener in &listeners {
            if let Err(e) = listener.on_event(&event) {
                warn!(event = event.name(), error = %e, "Session listener failed");
            }
        }

        // No subscribers is not an error
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
