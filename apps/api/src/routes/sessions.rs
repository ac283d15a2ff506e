//! Session routes.
//!
//! Each user has at most one stored session. `POST` replaces it wholesale;
//! there is no merge and no version check, so the last writer wins.

use axum::extract::State;
use axum::routing::{get, post};
use axum::Router;
use tracing::{debug, info};

use fitnesswise_core::{DeleteResponse, SaveSessionRequest, StoredSession};

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(save_session))
        .route("/user/{user_id}", get(get_session).delete(delete_session))
}

async fn save_session(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SaveSessionRequest>,
) -> ApiResult<ApiJson<StoredSession>> {
    body.session_data.validate()?;

    let stored = state
        .storage
        .save_session(body.user_id, body.session_data)
        .await;

    debug!(
        user_id = stored.user_id,
        exercise_index = stored.session_data.current_exercise_index,
        "Session replicated"
    );
    Ok(ApiJson(stored))
}

async fn get_session(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<i64>,
) -> ApiResult<ApiJson<StoredSession>> {
    Ok(ApiJson(state.storage.session_for_user(user_id).await?))
}

/// Succeeds whether or not a row existed.
async fn delete_session(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<i64>,
) -> ApiJson<DeleteResponse> {
    let removed = state.storage.delete_session(user_id).await;
    info!(user_id, removed, "Session deleted");
    ApiJson(DeleteResponse { success: true })
}
