//! Scripted [`RemoteApi`] and [`SessionSource`] doubles for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;

use fitnesswise_core::{
    NewUser, NewWorkout, ProgramTemplate, StoredSession, User, UserUpdate, WorkoutProgram,
    WorkoutRecord, WorkoutSession,
};

use crate::autosave::SessionSource;
use crate::error::{SyncError, SyncResult};
use crate::events::EventBus;
use crate::remote::RemoteApi;

fn unavailable() -> SyncError {
    SyncError::ConnectionFailed("scripted outage".into())
}

/// Records every call; fails on demand; can hold upserts at a gate.
#[derive(Default)]
pub struct ScriptedRemote {
    fail_upserts: AtomicBool,
    fail_all: AtomicBool,
    upsert_calls: AtomicUsize,
    upserts: Mutex<Vec<(i64, WorkoutSession)>>,
    sessions: Mutex<HashMap<i64, StoredSession>>,
    workouts: Mutex<Vec<NewWorkout>>,
    user_updates: Mutex<Vec<(i64, UserUpdate)>>,
    deleted: Mutex<Vec<i64>>,
    gate: Mutex<Option<Arc<Notify>>>,
    entered: Notify,
}

impl ScriptedRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_upserts(&self, fail: bool) {
        self.fail_upserts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_everything(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    /// Makes upserts wait until the returned gate is notified.
    pub fn hold_upserts(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Resolves once an upsert has started.
    pub async fn upsert_started(&self) {
        self.entered.notified().await;
    }

    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    pub fn upserted(&self) -> Vec<(i64, WorkoutSession)> {
        self.upserts.lock().unwrap().clone()
    }

    pub fn seed_session(&self, user_id: i64, session: WorkoutSession) {
        self.sessions.lock().unwrap().insert(
            user_id,
            StoredSession {
                id: user_id,
                user_id,
                session_data: session,
                last_saved: Utc::now(),
            },
        );
    }

    pub fn recorded_workouts(&self) -> Vec<NewWorkout> {
        self.workouts.lock().unwrap().clone()
    }

    pub fn user_updates(&self) -> Vec<(i64, UserUpdate)> {
        self.user_updates.lock().unwrap().clone()
    }

    pub fn deleted_sessions(&self) -> Vec<i64> {
        self.deleted.lock().unwrap().clone()
    }

    fn failing(&self) -> bool {
        self.fail_all.load(Ordering::SeqCst)
    }

    fn user(id: i64) -> User {
        User {
            id,
            email: format!("user{}@example.com", id),
            firebase_uid: format!("uid-{}", id),
            username: format!("user{}", id),
            current_streak: 2,
            total_workouts: 5,
            created_at: Utc::now(),
        }
    }
}

#[async_trait]
impl RemoteApi for ScriptedRemote {
    async fn upsert_session(&self, user_id: i64, session: &WorkoutSession) -> SyncResult<StoredSession> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.failing() || self.fail_upserts.load(Ordering::SeqCst) {
            return Err(unavailable());
        }

        self.upserts.lock().unwrap().push((user_id, session.clone()));
        let stored = StoredSession {
            id: user_id,
            user_id,
            session_data: session.clone(),
            last_saved: Utc::now(),
        };
        self.sessions.lock().unwrap().insert(user_id, stored.clone());
        Ok(stored)
    }

    async fn fetch_session(&self, user_id: i64) -> SyncResult<Option<StoredSession>> {
        if self.failing() {
            return Err(unavailable());
        }
        Ok(self.sessions.lock().unwrap().get(&user_id).cloned())
    }

    async fn delete_session(&self, user_id: i64) -> SyncResult<()> {
        if self.failing() {
            return Err(unavailable());
        }
        self.sessions.lock().unwrap().remove(&user_id);
        self.deleted.lock().unwrap().push(user_id);
        Ok(())
    }

    async fn record_workout(&self, workout: &NewWorkout) -> SyncResult<WorkoutRecord> {
        if self.failing() {
            return Err(unavailable());
        }
        let mut workouts = self.workouts.lock().unwrap();
        workouts.push(workout.clone());
        Ok(WorkoutRecord {
            id: workouts.len() as i64,
            user_id: workout.user_id,
            workout_day: workout.workout_day,
            start_time: workout.start_time,
            end_time: workout.end_time,
            duration: workout.duration,
            completed: workout.completed,
            notes: workout.notes.clone(),
            created_at: Utc::now(),
        })
    }

    async fn get_user(&self, user_id: i64) -> SyncResult<User> {
        if self.failing() {
            return Err(unavailable());
        }
        Ok(Self::user(user_id))
    }

    async fn update_user(&self, user_id: i64, update: &UserUpdate) -> SyncResult<User> {
        if self.failing() {
            return Err(unavailable());
        }
        self.user_updates.lock().unwrap().push((user_id, update.clone()));
        let mut user = Self::user(user_id);
        if let Some(total) = update.total_workouts {
            user.total_workouts = total;
        }
        if let Some(streak) = update.current_streak {
            user.current_streak = streak;
        }
        Ok(user)
    }

    async fn create_user(&self, user: &NewUser) -> SyncResult<User> {
        if self.failing() {
            return Err(unavailable());
        }
        let mut created = Self::user(1);
        created.email = user.email.clone();
        created.firebase_uid = user.firebase_uid.clone();
        created.username = user.username.clone();
        created.current_streak = 0;
        created.total_workouts = 0;
        Ok(created)
    }

    async fn find_user_by_firebase_uid(&self, uid: &str) -> SyncResult<Option<User>> {
        if self.failing() {
            return Err(unavailable());
        }
        Ok(uid
            .strip_prefix("uid-")
            .and_then(|id| id.parse().ok())
            .map(Self::user))
    }
}

/// A live session held in memory, with no database behind it.
pub struct FixedSession {
    session: WorkoutSession,
    events: Arc<EventBus>,
}

impl FixedSession {
    pub fn owned_by(user_id: i64) -> Self {
        let template = ProgramTemplate::for_program(WorkoutProgram::A);
        FixedSession {
            session: WorkoutSession::start(WorkoutProgram::A, &template.exercises, Utc::now(), Some(user_id)),
            events: Arc::new(EventBus::new()),
        }
    }
}

#[async_trait]
impl SessionSource for FixedSession {
    async fn has_live_session(&self) -> bool {
        true
    }

    async fn persist_local(&self) -> SyncResult<Option<WorkoutSession>> {
        Ok(Some(self.session.clone()))
    }

    async fn live_owner(&self) -> Option<i64> {
        self.session.owner_user_id
    }

    fn events(&self) -> &Arc<EventBus> {
        &self.events
    }
}
