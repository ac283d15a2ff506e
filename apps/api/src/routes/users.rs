//! User routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use tracing::info;

use fitnesswise_core::validation::{validate_new_user, validate_user_update};
use fitnesswise_core::{NewUser, User, UserUpdate};

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_user))
        .route("/{id}", get(get_user).patch(update_user))
        .route("/firebase/{uid}", get(get_user_by_firebase_uid))
}

async fn create_user(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<NewUser>,
) -> ApiResult<(StatusCode, ApiJson<User>)> {
    validate_new_user(&body)?;
    let user = state.storage.create_user(body).await?;
    info!(user_id = user.id, "User registered");
    Ok((StatusCode::CREATED, ApiJson(user)))
}

async fn get_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<ApiJson<User>> {
    Ok(ApiJson(state.storage.get_user(id).await?))
}

async fn get_user_by_firebase_uid(
    State(state): State<AppState>,
    ApiPath(uid): ApiPath<String>,
) -> ApiResult<ApiJson<User>> {
    Ok(ApiJson(state.storage.get_user_by_firebase_uid(&uid).await?))
}

async fn update_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<UserUpdate>,
) -> ApiResult<ApiJson<User>> {
    validate_user_update(&body)?;
    Ok(ApiJson(state.storage.update_user(id, body).await?))
}
