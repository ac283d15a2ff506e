//! Liveness check.

use axum::extract::State;
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::extract::ApiJson;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_secs: i64,
    pub server_time: DateTime<Utc>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(health))
}

async fn health(State(state): State<AppState>) -> ApiJson<HealthResponse> {
    let now = Utc::now();
    ApiJson(HealthResponse {
        status: "ok",
        uptime_secs: (now - state.started_at).num_seconds().max(0),
        server_time: now,
    })
}
