//! # Workout Timer
//!
//! Wall-clock based elapsed-time accounting.
//!
//! ## State Machine
//! ```text
//!            start()            pause()
//!   Idle ─────────────► Running ───────► Paused
//!                          ▲                │
//!                          └────────────────┘
//!                               start()
//!   Running | Paused ──stop()──► Stopped ──reset()──► Idle
//! ```
//!
//! Elapsed time is never counted tick by tick. It is always recomputed as
//! `accumulated + (now - running_since)`, so a host that suspends the process
//! (phone screen off, tab in background) reads the correct value on resume.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::session::TimerState;

/// Timer lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerPhase {
    #[default]
    Idle,
    Running,
    Paused,
    Stopped,
}

/// Pure timer. Every method takes `now` explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timer {
    phase: TimerPhase,
    /// Time banked from earlier running stretches.
    accumulated_ms: u64,
    /// Set only while running.
    running_since: Option<DateTime<Utc>>,
}

impl Timer {
    /// Creates an idle timer at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a timer from a persisted snapshot.
    ///
    /// A running snapshot resumes from its start reference, so any time the
    /// process spent suspended is counted. A stopped timer restores as paused.
    pub fn from_state(state: &TimerState) -> Self {
        match (state.running, state.start_epoch) {
            (true, Some(start)) => Timer {
                phase: TimerPhase::Running,
                accumulated_ms: 0,
                running_since: Some(start),
            },
            (_, _) if state.elapsed_ms > 0 => Timer {
                phase: TimerPhase::Paused,
                accumulated_ms: state.elapsed_ms,
                running_since: None,
            },
            _ => Timer::new(),
        }
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == TimerPhase::Running
    }

    /// Starts or resumes. Returns false when nothing changed.
    pub fn start(&mut self, now: DateTime<Utc>) -> bool {
        match self.phase {
            TimerPhase::Running | TimerPhase::Stopped => false,
            TimerPhase::Idle | TimerPhase::Paused => {
                self.running_since = Some(now);
                self.phase = TimerPhase::Running;
                true
            }
        }
    }

    /// Pauses a running timer. Returns false when nothing changed.
    pub fn pause(&mut self, now: DateTime<Utc>) -> bool {
        if self.phase != TimerPhase::Running {
            return false;
        }
        self.accumulated_ms = self.elapsed_ms(now);
        self.running_since = None;
        self.phase = TimerPhase::Paused;
        true
    }

    /// Freezes the timer at its final value.
    pub fn stop(&mut self, now: DateTime<Utc>) -> bool {
        match self.phase {
            TimerPhase::Idle | TimerPhase::Stopped => false,
            TimerPhase::Running | TimerPhase::Paused => {
                self.accumulated_ms = self.elapsed_ms(now);
                self.running_since = None;
                self.phase = TimerPhase::Stopped;
                true
            }
        }
    }

    /// Back to idle at zero.
    pub fn reset(&mut self) {
        *self = Timer::new();
    }

    /// Elapsed active time at `now`.
    ///
    /// A clock that moved backwards contributes zero rather than underflowing.
    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> u64 {
        let live = self
            .running_since
            .map(|since| (now - since).num_milliseconds().max(0) as u64)
            .unwrap_or(0);
        self.accumulated_ms.saturating_add(live)
    }

    /// Snapshot suitable for the session and the `timer-state` slot.
    pub fn snapshot(&self, now: DateTime<Utc>) -> TimerState {
        let elapsed_ms = self.elapsed_ms(now);
        let start_epoch = if self.is_running() {
            Some(now - Duration::milliseconds(elapsed_ms as i64))
        } else {
            None
        };

        TimerState {
            running: self.is_running(),
            elapsed_ms,
            start_epoch,
        }
    }
}

/// Formats elapsed milliseconds as `m:ss`, or `h:mm:ss` past the hour.
pub fn format_elapsed(elapsed_ms: u64) -> String {
    let total_secs = elapsed_ms / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

// =============================================================================
// Tests
// =============================================================================
