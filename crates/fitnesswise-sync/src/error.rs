//! # Sync Error Types
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Remote        │  │     Session             │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Connection     │  │  NoLiveSession          │ │
//! │  │  InvalidUrl     │  │  Timeout        │  │  Validation             │ │
//! │  │  ConfigLoad/Save│  │  RemoteRejected │  │  Storage                │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only the remote category reaches the retry queue; a 4xx rejection is
//! never retried.

use thiserror::Error;

use fitnesswise_core::{CoreError, ValidationError};

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors raised by the session store, the scheduler and the HTTP client.
#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid tracker configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Local Storage Errors
    // =========================================================================
    /// Local database failure. Mutations that hit this have not been
    /// persisted.
    #[error("Local storage error: {0}")]
    Storage(String),

    // =========================================================================
    // Remote Errors
    // =========================================================================
    /// The request never got a response.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The HTTP client gave up waiting for a response.
    #[error("Request timed out")]
    Timeout,

    /// The server answered with a non-2xx status.
    ///
    /// ## When This Occurs
    /// - 400 for a payload the server refuses
    /// - 404 for a missing user
    /// - 5xx when the server itself failed
    #[error("Remote rejected request ({status}): {message}")]
    RemoteRejected { status: u16, message: String },

    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    // =========================================================================
    // Session Errors
    // =========================================================================
    #[error("No live workout session")]
    NoLiveSession,

    #[error("Validation failed: {0}")]
    Validation(String),

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// A background loop has already stopped.
    #[error("Tracker is shutting down")]
    ShuttingDown,
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<fitnesswise_db::DbError> for SyncError {
    fn from(err: fitnesswise_db::DbError) -> Self {
        SyncError::Storage(err.to_string())
    }
}

impl From<ValidationError> for SyncError {
    fn from(err: ValidationError) -> Self {
        SyncError::Validation(err.to_string())
    }
}

impl From<CoreError> for SyncError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NoLiveSession => SyncError::NoLiveSession,
            other => SyncError::Validation(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::SerializationFailed(err.to_string())
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SyncError::Timeout
        } else if err.is_decode() {
            SyncError::SerializationFailed(err.to_string())
        } else if let Some(status) = err.status() {
            SyncError::RemoteRejected {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            SyncError::ConnectionFailed(err.to_string())
        }
    }
}

// =============================================================================
// Error Categorization (for retry logic)
// =============================================================================

impl SyncError {
    /// Returns true if a later attempt at the same request could succeed.
    ///
    /// ## Retryable Errors
    /// - Connection failures and timeouts
    /// - 5xx responses
    ///
    /// ## Non-Retryable Errors
    /// - 4xx responses (the payload itself is refused)
    /// - Configuration, validation and local storage errors
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::ConnectionFailed(_) | SyncError::Timeout => true,
            SyncError::RemoteRejected { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns true for a 404 from the server.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::RemoteRejected { status: 404, .. })
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::InvalidUrl(_)
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(SyncError::ConnectionFailed("refused".into()).is_retryable());
        assert!(SyncError::Timeout.is_retryable());
        assert!(SyncError::RemoteRejected {
            status: 503,
            message: "busy".into()
        }
        .is_retryable());

        assert!(!SyncError::RemoteRejected {
            status: 400,
            message: "bad".into()
        }
        .is_retryable());
        assert!(!SyncError::InvalidConfig("bad".into()).is_retryable());
        assert!(!SyncError::NoLiveSession.is_retryable());
    }

    #[test]
    fn test_not_found() {
        let err = SyncError::RemoteRejected {
            status: 404,
            message: "Session not found".into(),
        };
        assert!(err.is_not_found());
        assert!(err.to_string().contains("Session not found"));
    }

    #[test]
    fn test_core_conversion() {
        let err: SyncError = CoreError::NoLiveSession.into();
        assert!(matches!(err, SyncError::NoLiveSession));

        let err: SyncError = ValidationError::required("email").into();
        assert!(matches!(err, SyncError::Validation(_)));
    }
}
