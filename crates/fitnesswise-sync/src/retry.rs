//! # Retry Queue
//!
//! Snapshots of sessions whose upsert failed, each with its own schedule.
//!
//! ## Entry Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  upsert fails ──► enqueue (retryCount 0, due in 5s)                     │
//! │                        │                                                │
//! │                        ▼                                                │
//! │               attempt fails ──► retryCount 1, due in 10s               │
//! │                        │                                                │
//! │                        ▼                                                │
//! │               attempt fails ──► retryCount 2, due in 20s               │
//! │                        │                                                │
//! │                        ▼                                                │
//! │               attempt fails ──► dropped (Exhausted)                    │
//! │                                                                         │
//! │  any attempt succeeds ──► removed                                      │
//! │  auto-save succeeds   ──► whole queue cleared                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! An entry replays the session as it was when it was queued. A newer state
//! only wins if an auto-save succeeds first and clears the queue.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use uuid::Uuid;

use fitnesswise_core::WorkoutSession;

/// Exponential delay schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(base_delay: Duration, max_attempts: u32) -> Self {
        RetryPolicy {
            base_delay,
            max_attempts,
        }
    }

    /// Delay before the attempt for an entry at `retry_count`.
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        match 1u32.checked_shl(retry_count) {
            Some(factor) => self.base_delay.checked_mul(factor).unwrap_or(Duration::MAX),
            None => Duration::MAX,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::new(Duration::from_secs(5), 3)
    }
}

/// `now + delay`, saturating about thirty years out.
fn schedule(now: Instant, delay: Duration) -> Instant {
    now.checked_add(delay)
        .unwrap_or_else(|| now + Duration::from_secs(30 * 365 * 24 * 3600))
}

/// A queued snapshot.
#[derive(Debug, Clone)]
pub struct RetryEntry {
    pub id: Uuid,
    pub user_id: i64,
    pub snapshot: WorkoutSession,
    pub enqueued_at: DateTime<Utc>,
    /// Failed retry attempts so far.
    pub retry_count: u32,
    pub next_attempt_at: Instant,
    pub last_error: Option<String>,
}

/// What happened to an entry after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryVerdict {
    Rescheduled { retry_count: u32, delay: Duration },
    Exhausted,
}

/// FIFO of pending retries.
#[derive(Debug, Default)]
pub struct RetryQueue {
    policy: RetryPolicy,
    entries: VecDeque<RetryEntry>,
}

impl RetryQueue {
    pub fn new(policy: RetryPolicy) -> Self {
        RetryQueue {
            policy,
            entries: VecDeque::new(),
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Queues a snapshot with `retry_count` 0.
    pub fn enqueue(
        &mut self,
        user_id: i64,
        snapshot: WorkoutSession,
        now: DateTime<Utc>,
        now_instant: Instant,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.entries.push_back(RetryEntry {
            id,
            user_id,
            snapshot,
            enqueued_at: now,
            retry_count: 0,
            next_attempt_at: schedule(now_instant, self.policy.delay_for(0)),
            last_error: None,
        });
        id
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &RetryEntry> {
        self.entries.iter()
    }

    /// Entries whose next attempt is at or before `now`, oldest first.
    pub fn due(&self, now: Instant) -> Vec<RetryEntry> {
        self.entries
            .iter()
            .filter(|e| e.next_attempt_at <= now)
            .cloned()
            .collect()
    }

    /// Records a failed attempt. Drops the entry once it has used all its
    /// attempts.
    ///
    /// Returns `None` if the entry is no longer queued.
    pub fn record_failure(&mut self, id: Uuid, error: &str, now: Instant) -> Option<RetryVerdict> {
        let pos = self.entries.iter().position(|e| e.id == id)?;
        let policy = self.policy;
        let entry = &mut self.entries[pos];

        entry.retry_count += 1;
        entry.last_error = Some(error.to_string());

        if entry.retry_count >= policy.max_attempts {
            self.entries.remove(pos);
            return Some(RetryVerdict::Exhausted);
        }

        let delay = policy.delay_for(entry.retry_count);
        entry.next_attempt_at = schedule(now, delay);
        Some(RetryVerdict::Rescheduled {
            retry_count: entry.retry_count,
            delay,
        })
    }

    /// Removes an entry. Returns true if it was queued.
    pub fn remove(&mut self, id: Uuid) -> bool {
        match self.entries.iter().position(|e| e.id == id) {
            Some(pos) => {
                self.entries.remove(pos);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitnesswise_core::{ProgramTemplate, WorkoutProgram};

    fn snapshot() -> WorkoutSession {
        let template = ProgramTemplate::for_program(WorkoutProgram::A);
        WorkoutSession::start(WorkoutProgram::A, &template.exercises, Utc::now(), Some(1))
    }

    #[test]
    fn test_delay_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(5));
        assert_eq!(policy.delay_for(1), Duration::from_secs(10));
        assert_eq!(policy.delay_for(2), Duration::from_secs(20));
        assert_eq!(policy.delay_for(64), Duration::MAX);
    }

    #[test]
    fn test_entry_due_after_base_delay() {
        let mut queue = RetryQueue::new(RetryPolicy::default());
        let t0 = Instant::now();
        queue.enqueue(1, snapshot(), Utc::now(), t0);

        assert!(queue.due(t0 + Duration::from_secs(4)).is_empty());
        let due = queue.due(t0 + Duration::from_secs(5));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].retry_count, 0);
    }

    #[test]
    fn test_three_failures_exhaust_entry() {
        let mut queue = RetryQueue::new(RetryPolicy::default());
        let t0 = Instant::now();
        let id = queue.enqueue(1, snapshot(), Utc::now(), t0);

        assert_eq!(
            queue.record_failure(id, "down", t0),
            Some(RetryVerdict::Rescheduled {
                retry_count: 1,
                delay: Duration::from_secs(10)
            })
        );
        assert_eq!(
            queue.record_failure(id, "down", t0),
            Some(RetryVerdict::Rescheduled {
                retry_count: 2,
                delay: Duration::from_secs(20)
            })
        );
        assert_eq!(queue.entries().next().unwrap().last_error.as_deref(), Some("down"));

        assert_eq!(queue.record_failure(id, "down", t0), Some(RetryVerdict::Exhausted));
        assert!(queue.is_empty());
        assert_eq!(queue.record_failure(id, "down", t0), None);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut queue = RetryQueue::new(RetryPolicy::default());
        let t0 = Instant::now();
        let first = queue.enqueue(1, snapshot(), Utc::now(), t0);
        queue.enqueue(1, snapshot(), Utc::now(), t0);

        assert!(queue.remove(first));
        assert!(!queue.remove(first));
        assert_eq!(queue.len(), 1);

        queue.clear();
        assert!(queue.is_empty());
    }
}
