//! Error types for the API.
//!
//! Every failure leaves the server as `{ "error": "<message>" }` with a
//! matching status code.
//!
//! ```text
//! ValidationError / malformed body / bad path  → 400
//! StorageError::NotFound                       → 404
//! StorageError::Duplicate                      → 409
//! anything else                                → 500
//! ```

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{debug, error};

use fitnesswise_core::{CoreError, ErrorBody, ValidationError};

use crate::storage::StorageError;

/// API errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(%status, error = %self, "Request failed");
        } else {
            debug!(%status, error = %self, "Request rejected");
        }

        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NoLiveSession => ApiError::NotFound(err.to_string()),
            CoreError::UnknownProgram(_)
            | CoreError::InvalidSession(_)
            | CoreError::Validation(_) => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            StorageError::Duplicate { .. } => ApiError::Conflict(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;
