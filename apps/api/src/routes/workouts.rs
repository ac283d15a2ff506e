//! Workout routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::Router;
use tracing::info;

use fitnesswise_core::validation::{validate_new_workout, validate_workout_update};
use fitnesswise_core::{NewWorkout, WorkoutRecord, WorkoutUpdate};

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_workout))
        .route("/user/{user_id}", get(list_for_user))
        .route("/{id}", patch(update_workout))
}

async fn create_workout(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<NewWorkout>,
) -> ApiResult<(StatusCode, ApiJson<WorkoutRecord>)> {
    validate_new_workout(&body)?;
    let workout = state.storage.create_workout(body).await?;
    info!(
        workout_id = workout.id,
        user_id = workout.user_id,
        day = %workout.workout_day,
        completed = workout.completed,
        "Workout recorded"
    );
    Ok((StatusCode::CREATED, ApiJson(workout)))
}

async fn list_for_user(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<i64>,
) -> ApiJson<Vec<WorkoutRecord>> {
    ApiJson(state.storage.workouts_for_user(user_id).await)
}

async fn update_workout(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<WorkoutUpdate>,
) -> ApiResult<ApiJson<WorkoutRecord>> {
    validate_workout_update(&body)?;
    Ok(ApiJson(state.storage.update_workout(id, body).await?))
}
