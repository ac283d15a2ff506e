//! # Slot Repository
//!
//! Fixed-name key/value slots holding JSON text. Each write replaces the
//! slot's whole value.
//!
//! ```text
//! ┌────────────────┬──────────────────────────────────────────────┐
//! │ key            │ value                                        │
//! ├────────────────┼──────────────────────────────────────────────┤
//! │ live-session   │ full WorkoutSession JSON                     │
//! │ timer-state    │ { running, elapsedMs, startEpoch }           │
//! │ owning-user-id │ numeric user id                              │
//! │ last-save      │ RFC 3339 timestamp of the last local save    │
//! └────────────────┴──────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};

/// Names of the local slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKey {
    LiveSession,
    TimerState,
    OwningUserId,
    LastSave,
}

impl SlotKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotKey::LiveSession => "live-session",
            SlotKey::TimerState => "timer-state",
            SlotKey::OwningUserId => "owning-user-id",
            SlotKey::LastSave => "last-save",
        }
    }
}

impl std::fmt::Display for SlotKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Repository for local slots.
#[derive(Debug, Clone)]
pub struct SlotRepository {
    pool: SqlitePool,
}

impl SlotRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SlotRepository { pool }
    }

    /// Reads a slot's raw JSON text.
    pub async fn get_raw(&self, key: SlotKey) -> DbResult<Option<String>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM local_slots WHERE key = ?1")
                .bind(key.as_str())
                .fetch_optional(&self.pool)
                .await?;
        Ok(value)
    }

    /// Writes a slot's raw JSON text, replacing any previous value.
    pub async fn put_raw(&self, key: SlotKey, value: &str) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO local_slots (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key.as_str())
        .bind(value)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!(slot = %key, bytes = value.len(), "Slot written");
        Ok(())
    }

    /// Reads and decodes a slot.
    ///
    /// ## Returns
    /// * `Ok(None)` - Slot is empty
    /// * `Err(DbError::CorruptSlot)` - Slot holds text that doesn't decode
    pub async fn get<T: DeserializeOwned>(&self, key: SlotKey) -> DbResult<Option<T>> {
        match self.get_raw(key).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| DbError::CorruptSlot {
                    key: key.as_str().to_string(),
                    reason: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    /// Encodes and writes a slot.
    pub async fn put<T: Serialize>(&self, key: SlotKey, value: &T) -> DbResult<()> {
        let raw = serde_json::to_string(value)?;
        self.put_raw(key, &raw).await
    }

    /// Empties a slot. Returns true if it held a value.
    pub async fn remove(&self, key: SlotKey) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM local_slots WHERE key = ?1")
            .bind(key.as_str())
            .execute(&self.pool)
            .await?;

        debug!(slot = %key, removed = result.rows_affected(), "Slot cleared");
        Ok(result.rows_affected() > 0)
    }

    /// When the slot was last written.
    pub async fn updated_at(&self, key: SlotKey) -> DbResult<Option<DateTime<Utc>>> {
        let ts: Option<DateTime<Utc>> =
            sqlx::query_scalar("SELECT updated_at FROM local_slots WHERE key = ?1")
                .bind(key.as_str())
                .fetch_optional(&self.pool)
                .await?;
        Ok(ts)
    }
}
