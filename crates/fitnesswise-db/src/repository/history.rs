//! # History Repository
//!
//! Append-only log of archived workouts.
//!
//! ## Archiving
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   SINGLE TRANSACTION (archive)                          │
//! │                                                                         │
//! │  1. INSERT INTO workout_history (..., payload)                          │
//! │  2. DELETE FROM local_slots                                            │
//! │     WHERE key IN ('live-session', 'timer-state')                       │
//! │                                                                         │
//! │  Either the session is in history and the live slot is empty, or       │
//! │  nothing changed.                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::SqlitePool;
use tracing::{debug, info};

use fitnesswise_core::ArchivedWorkout;

use crate::error::{DbError, DbResult};
use crate::repository::slots::SlotKey;

/// Repository for the workout history log.
#[derive(Debug, Clone)]
pub struct HistoryRepository {
    pool: SqlitePool,
}

impl HistoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        HistoryRepository { pool }
    }

    /// Appends an archived workout.
    pub async fn append(&self, archived: &ArchivedWorkout) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert_row(&mut *conn, archived).await
    }

    /// Appends an archived workout and clears the live session and timer
    /// slots in one transaction.
    pub async fn archive(&self, archived: &ArchivedWorkout) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        insert_row(&mut *tx, archived).await?;

        sqlx::query("DELETE FROM local_slots WHERE key IN (?1, ?2)")
            .bind(SlotKey::LiveSession.as_str())
            .bind(SlotKey::TimerState.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            id = %archived.id,
            program = %archived.session.program,
            duration_secs = archived.duration_secs,
            "Workout archived"
        );
        Ok(())
    }

    /// Archived workouts, newest first.
    pub async fn list(&self, limit: u32) -> DbResult<Vec<ArchivedWorkout>> {
        let rows: Vec<String> = sqlx::query_scalar(
            "SELECT payload FROM workout_history ORDER BY seq DESC LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|payload| {
                serde_json::from_str(payload).map_err(|e| DbError::CorruptSlot {
                    key: "workout_history".to_string(),
                    reason: e.to_string(),
                })
            })
            .collect()
    }

    /// Number of archived workouts.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM workout_history")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

async fn insert_row(
    conn: &mut sqlx::SqliteConnection,
    archived: &ArchivedWorkout,
) -> DbResult<()> {
    let payload = serde_json::to_string(archived)?;

    sqlx::query(
        r#"
        INSERT INTO workout_history (
            id, program, started_at, completed_at, duration_secs, payload, seq
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6,
            COALESCE((SELECT MAX(seq) FROM workout_history), 0) + 1
        )
        "#,
    )
    .bind(archived.id.to_string())
    .bind(archived.session.program.as_str())
    .bind(archived.session.started_at)
    .bind(archived.completed_at)
    .bind(archived.duration_secs)
    .bind(payload)
    .execute(&mut *conn)
    .await?;

    debug!(id = %archived.id, "History row inserted");
    Ok(())
}
