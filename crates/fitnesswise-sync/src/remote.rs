//! # Remote API Client
//!
//! The seam between the tracker and the REST API. The scheduler and the
//! session store only see [`RemoteApi`]; [`HttpRemote`] is the production
//! implementation.
//!
//! ```text
//! ┌──────────────┐   upsert_session    ┌─────────────────────────────────┐
//! │  AutoSaver   │────────────────────►│                                 │
//! └──────────────┘                     │  HttpRemote (reqwest::Client)   │
//! ┌──────────────┐   fetch_session     │                                 │
//! │ SessionStore │   record_workout    │  POST   {base}/sessions         │
//! │              │   get/update_user   │  GET    {base}/sessions/user/ID │──► API
//! │              │   delete_session    │  DELETE {base}/sessions/user/ID │
//! └──────────────┘────────────────────►│  POST   {base}/workouts         │
//!                                      │  GET    {base}/users/ID  ...    │
//!                                      └─────────────────────────────────┘
//! ```
//!
//! Non-2xx responses become [`SyncError::RemoteRejected`] carrying the
//! server's `{ "error": ... }` message.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use fitnesswise_core::{
    DeleteResponse, ErrorBody, NewUser, NewWorkout, SaveSessionRequest, StoredSession, User,
    UserUpdate, WorkoutRecord, WorkoutSession,
};

use crate::error::{SyncError, SyncResult};

/// Operations the tracker needs from the server.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Replaces the user's stored session.
    async fn upsert_session(&self, user_id: i64, session: &WorkoutSession) -> SyncResult<StoredSession>;

    /// The user's stored session, or `None` when the server has none.
    async fn fetch_session(&self, user_id: i64) -> SyncResult<Option<StoredSession>>;

    async fn delete_session(&self, user_id: i64) -> SyncResult<()>;

    async fn record_workout(&self, workout: &NewWorkout) -> SyncResult<WorkoutRecord>;

    async fn get_user(&self, user_id: i64) -> SyncResult<User>;

    async fn update_user(&self, user_id: i64, update: &UserUpdate) -> SyncResult<User>;

    async fn create_user(&self, user: &NewUser) -> SyncResult<User>;

    async fn find_user_by_firebase_uid(&self, uid: &str) -> SyncResult<Option<User>>;
}

// =============================================================================
// HTTP Implementation
// =============================================================================

/// [`RemoteApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: Client,
    base: Url,
}

impl HttpRemote {
    /// Creates a client for `base_url` (including the `/api` prefix).
    pub fn new(base_url: &str, timeout: Duration) -> SyncResult<Self> {
        let base = Url::parse(base_url)?;
        if base.cannot_be_a_base() {
            return Err(SyncError::InvalidUrl(format!("{} cannot be a base URL", base_url)));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::InvalidConfig(format!("HTTP client: {}", e)))?;

        Ok(HttpRemote { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Appends percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> SyncResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| SyncError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Decodes a 2xx body, or turns the error body into `RemoteRejected`.
async fn decode<T: DeserializeOwned>(response: Response) -> SyncResult<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
    };
    Err(SyncError::RemoteRejected {
        status: status.as_u16(),
        message,
    })
}

/// Like [`decode`], but a 404 is `None`.
async fn decode_optional<T: DeserializeOwned>(response: Response) -> SyncResult<Option<T>> {
    if response.status() == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    decode(response).await.map(Some)
}

#[async_trait]
impl RemoteApi for HttpRemote {
    async fn upsert_session(&self, user_id: i64, session: &WorkoutSession) -> SyncResult<StoredSession> {
        let url = self.endpoint(&["sessions"])?;
        let body = SaveSessionRequest {
            user_id,
            session_data: session.clone(),
        };

        debug!(user_id, %url, "Upserting session");
        let response = self.client.post(url).json(&body).send().await?;
        decode(response).await
    }

    async fn fetch_session(&self, user_id: i64) -> SyncResult<Option<StoredSession>> {
        let id = user_id.to_string();
        let url = self.endpoint(&["sessions", "user", &id])?;
        let response = self.client.get(url).send().await?;
        decode_optional(response).await
    }

    async fn delete_session(&self, user_id: i64) -> SyncResult<()> {
        let id = user_id.to_string();
        let url = self.endpoint(&["sessions", "user", &id])?;
        let response = self.client.delete(url).send().await?;
        let _: DeleteResponse = decode(response).await?;
        Ok(())
    }

    async fn record_workout(&self, workout: &NewWorkout) -> SyncResult<WorkoutRecord> {
        let url = self.endpoint(&["workouts"])?;
        let response = self.client.post(url).json(workout).send().await?;
        decode(response).await
    }

    async fn get_user(&self, user_id: i64) -> SyncResult<User> {
        let id = user_id.to_string();
        let url = self.endpoint(&["users", &id])?;
        let response = self.client.get(url).send().await?;
        decode(response).await
    }

    async fn update_user(&self, user_id: i64, update: &UserUpdate) -> SyncResult<User> {
        let id = user_id.to_string();
        let url = self.endpoint(&["users", &id])?;
        let response = self.client.patch(url).json(update).send().await?;
        decode(response).await
    }

    async fn create_user(&self, user: &NewUser) -> SyncResult<User> {
        let url = self.endpoint(&["users"])?;
        let response = self.client.post(url).json(user).send().await?;
        decode(response).await
    }

    async fn find_user_by_firebase_uid(&self, uid: &str) -> SyncResult<Option<User>> {
        let url = self.endpoint(&["users", "firebase", uid])?;
        let response = self.client.get(url).send().await?;
        decode_optional(response).await
    }
}
