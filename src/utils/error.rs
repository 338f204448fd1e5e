//! Error types and handling
//!
//! Domain errors surfaced by the orchestration engine. Callers can tell a
//! not-found condition apart from a bad request or a backend failure.

use crate::capture::CaptureError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A capture backend named in error messages and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Video,
    Audio,
    Streaming,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Video => write!(f, "video"),
            Backend::Audio => write!(f, "audio"),
            Backend::Streaming => write!(f, "streaming"),
        }
    }
}

/// Engine-wide error type
#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("meeting {0} already has an active session")]
    DuplicateSession(String),

    #[error("session {0} not found")]
    SessionNotFound(Uuid),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("failed to start {backend} capture: {source}")]
    BackendStart {
        backend: Backend,
        source: CaptureError,
    },

    #[error("failed to stop {backend} capture: {source}")]
    BackendStop {
        backend: Backend,
        source: CaptureError,
    },
}

impl RecorderError {
    pub(crate) fn start(backend: Backend) -> impl FnOnce(CaptureError) -> Self {
        move |source| Self::BackendStart { backend, source }
    }

    pub(crate) fn stop(backend: Backend) -> impl FnOnce(CaptureError) -> Self {
        move |source| Self::BackendStop { backend, source }
    }
}

/// Error response for the embedding API layer
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<RecorderError> for ErrorResponse {
    fn from(error: RecorderError) -> Self {
        let code = match &error {
            RecorderError::DuplicateSession(_) => "DUPLICATE_SESSION",
            RecorderError::SessionNotFound(_) => "SESSION_NOT_FOUND",
            RecorderError::Validation(_) => "VALIDATION_ERROR",
            RecorderError::BackendStart { .. } => "BACKEND_START_ERROR",
            RecorderError::BackendStop { .. } => "BACKEND_STOP_ERROR",
        };

        ErrorResponse {
            code: code.to_string(),
            message: error.to_string(),
        }
    }
}

/// Result type alias using RecorderError
pub type RecorderResult<T> = Result<T, RecorderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_codes_distinguish_categories() {
        let not_found: ErrorResponse = RecorderError::SessionNotFound(Uuid::new_v4()).into();
        assert_eq!(not_found.code, "SESSION_NOT_FOUND");

        let bad_request: ErrorResponse =
            RecorderError::Validation("stream URL is required".into()).into();
        assert_eq!(bad_request.code, "VALIDATION_ERROR");
        assert!(bad_request.message.contains("stream URL is required"));
    }
}
