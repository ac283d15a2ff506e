//! HTTP client against a live in-process API server.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use fitnesswise_api::AppState;
use fitnesswise_core::{
    NewUser, NewWorkout, ProgramTemplate, SaveStatus, UserUpdate, WorkoutProgram, WorkoutSession,
};
use fitnesswise_db::{Database, DbConfig};
use fitnesswise_sync::{
    AutoSaveOptions, AutoSaver, EventBus, HttpRemote, RemoteApi, SessionStore, SyncError,
    SystemClock, TickOutcome,
};

struct TestServer {
    base_url: String,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<std::io::Result<()>>>,
}

impl TestServer {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();

        let task = tokio::spawn(fitnesswise_api::run(listener, AppState::default(), async move {
            let _ = rx.await;
        }));

        TestServer {
            base_url: format!("http://{}/api", addr),
            shutdown: Some(tx),
            task: Some(task),
        }
    }

    fn remote(&self) -> HttpRemote {
        HttpRemote::new(&self.base_url, Duration::from_secs(5)).unwrap()
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            task.await.unwrap().unwrap();
        }
    }
}

fn new_user(n: u32) -> NewUser {
    NewUser {
        email: format!("Lifter{}@Example.com", n),
        firebase_uid: format!("firebase-{}", n),
        username: format!("lifter{}", n),
    }
}

fn session(program: WorkoutProgram, owner: i64) -> WorkoutSession {
    let template = ProgramTemplate::for_program(program);
    WorkoutSession::start(program, &template.exercises, Utc::now(), Some(owner))
}

#[tokio::test]
async fn test_user_lifecycle() {
    let server = TestServer::start().await;
    let remote = server.remote();

    let user = remote.create_user(&new_user(1)).await.unwrap();
    assert_eq!(user.email, "lifter1@example.com");
    assert_eq!(user.total_workouts, 0);

    let found = remote.find_user_by_firebase_uid("firebase-1").await.unwrap();
    assert_eq!(found.map(|u| u.id), Some(user.id));
    assert!(remote
        .find_user_by_firebase_uid("nobody")
        .await
        .unwrap()
        .is_none());

    let updated = remote
        .update_user(
            user.id,
            &UserUpdate {
                current_streak: Some(4),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.current_streak, 4);
    assert_eq!(remote.get_user(user.id).await.unwrap().current_streak, 4);

    let duplicate = remote.create_user(&new_user(1)).await.unwrap_err();
    assert!(matches!(duplicate, SyncError::RemoteRejected { status: 409, .. }));

    let missing = remote.get_user(9_999).await.unwrap_err();
    assert!(missing.is_not_found());
    assert!(!missing.is_retryable());

    server.stop().await;
}

#[tokio::test]
async fn test_session_upsert_fetch_delete() {
    let server = TestServer::start().await;
    let remote = server.remote();

    assert!(remote.fetch_session(3).await.unwrap().is_none());

    let first = session(WorkoutProgram::A, 3);
    let stored = remote.upsert_session(3, &first).await.unwrap();
    assert_eq!(stored.user_id, 3);

    let mut second = first.clone();
    second.exercises[0].sets[0].completed_reps = 10;
    let replaced = remote.upsert_session(3, &second).await.unwrap();
    assert_eq!(replaced.id, stored.id);

    let fetched = remote.fetch_session(3).await.unwrap().unwrap();
    assert_eq!(fetched.session_data, second);

    remote.delete_session(3).await.unwrap();
    assert!(remote.fetch_session(3).await.unwrap().is_none());

    // Deleting again is still a success
    remote.delete_session(3).await.unwrap();

    server.stop().await;
}

#[tokio::test]
async fn test_invalid_session_rejected() {
    let server = TestServer::start().await;
    let remote = server.remote();

    let mut broken = session(WorkoutProgram::B, 1);
    broken.current_exercise_index = 17;

    let err = remote.upsert_session(1, &broken).await.unwrap_err();
    assert!(matches!(err, SyncError::RemoteRejected { status: 400, .. }));
    assert!(!err.is_retryable());

    server.stop().await;
}

#[tokio::test]
async fn test_record_workout() {
    let server = TestServer::start().await;
    let remote = server.remote();

    let workout = NewWorkout {
        user_id: 2,
        workout_day: WorkoutProgram::C,
        start_time: Utc::now(),
        end_time: Some(Utc::now()),
        duration: Some(3_600),
        completed: true,
        notes: None,
    };
    let record = remote.record_workout(&workout).await.unwrap();
    assert_eq!(record.user_id, 2);
    assert_eq!(record.workout_day, WorkoutProgram::C);
    assert!(record.completed);

    server.stop().await;
}

#[tokio::test]
async fn test_unreachable_server_is_retryable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let remote = HttpRemote::new(&format!("http://{}/api", addr), Duration::from_secs(2)).unwrap();
    let err = remote
        .upsert_session(1, &session(WorkoutProgram::A, 1))
        .await
        .unwrap_err();
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_store_replicates_and_reports_completion() {
    let server = TestServer::start().await;
    let remote = Arc::new(server.remote());
    let user = remote.create_user(&new_user(7)).await.unwrap();

    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let store = Arc::new(
        SessionStore::open(db, Arc::new(SystemClock), remote.clone(), Arc::new(EventBus::new()))
            .await
            .unwrap(),
    );
    store.set_user(Some(user.id)).await.unwrap();

    let template = ProgramTemplate::for_program(WorkoutProgram::A);
    store
        .start_session(WorkoutProgram::A, &template.exercises)
        .await
        .unwrap();
    store.update_set_reps(0, 0, 8).await.unwrap();

    let saver = AutoSaver::new(store.clone(), remote.clone(), AutoSaveOptions::default());
    assert_eq!(saver.tick().await.unwrap(), TickOutcome::Replicated);
    assert_eq!(saver.status(), SaveStatus::Saved);

    let on_server = remote.fetch_session(user.id).await.unwrap().unwrap();
    assert_eq!(on_server.session_data.set(0, 0).unwrap().completed_reps, 8);

    let completed = store.complete_session().await.unwrap().unwrap();
    completed.report.unwrap().await.unwrap();

    let after = remote.get_user(user.id).await.unwrap();
    assert_eq!(after.total_workouts, 1);
    assert_eq!(after.current_streak, 1);
    assert!(remote.fetch_session(user.id).await.unwrap().is_none());

    server.stop().await;
}
