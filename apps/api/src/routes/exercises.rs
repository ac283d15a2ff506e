//! Exercise routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::Router;

use fitnesswise_core::validation::{validate_exercise_update, validate_new_exercise};
use fitnesswise_core::{ExerciseRecord, ExerciseUpdate, NewExercise};

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_exercise))
        .route("/workout/{workout_id}", get(list_for_workout))
        .route("/{id}", patch(update_exercise))
}

async fn create_exercise(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<NewExercise>,
) -> ApiResult<(StatusCode, ApiJson<ExerciseRecord>)> {
    validate_new_exercise(&body)?;
    let exercise = state.storage.create_exercise(body).await?;
    Ok((StatusCode::CREATED, ApiJson(exercise)))
}

async fn list_for_workout(
    State(state): State<AppState>,
    ApiPath(workout_id): ApiPath<i64>,
) -> ApiJson<Vec<ExerciseRecord>> {
    ApiJson(state.storage.exercises_for_workout(workout_id).await)
}

async fn update_exercise(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<ExerciseUpdate>,
) -> ApiResult<ApiJson<ExerciseRecord>> {
    validate_exercise_update(&body)?;
    Ok(ApiJson(state.storage.update_exercise(id, body).await?))
}
