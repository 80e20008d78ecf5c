//! Error taxonomy shared by every subsystem.
//!
//! All subsystem APIs return `Result<T, EngineError>` (spec §7, §9): no
//! subsystem throws across a boundary. HTTP status mapping lives here too,
//! following the reference backend's `DomainError` pattern, so `practice-api`
//! only has to call `.into_response()`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_events: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
}

/// The error kinds enumerated in spec §7. Carried as a value, never thrown.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("validation error: {0}")]
    Validation(String),

    /// Entity missing, or present but not owned by the requester. Deliberately
    /// indistinguishable from ownership mismatch (spec §4.2: never `Forbidden`,
    /// to avoid id enumeration).
    #[error("not found: {0}")]
    NotFound(String),

    #[error("version conflict: expected {expected}, found {found}")]
    VersionConflict { expected: u64, found: u64 },

    #[error("invalid transition: {event} not allowed from {current_state}")]
    InvalidTransition {
        current_state: String,
        event: String,
        allowed_events: Vec<String>,
    },

    #[error("backend error: {0}")]
    Backend(String),

    #[error("integrity check failed for {0}")]
    IntegrityFailure(String),

    #[error("decryption failed for {0}")]
    DecryptionFailure(String),

    #[error("curriculum generation failed: {0}")]
    GenerationFailed(String),

    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },
}

impl EngineError {
    pub fn not_found(entity: impl Into<String>) -> Self {
        Self::NotFound(entity.into())
    }

    pub fn invalid_transition(
        current_state: impl Into<String>,
        event: impl Into<String>,
        allowed_events: Vec<String>,
    ) -> Self {
        Self::InvalidTransition {
            current_state: current_state.into(),
            event: event.into(),
            allowed_events,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            EngineError::Validation(_) => StatusCode::BAD_REQUEST,
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::VersionConflict { .. } => StatusCode::CONFLICT,
            EngineError::InvalidTransition { .. } => StatusCode::BAD_REQUEST,
            EngineError::Backend(_) => StatusCode::SERVICE_UNAVAILABLE,
            EngineError::IntegrityFailure(_) | EngineError::DecryptionFailure(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            EngineError::GenerationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            EngineError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "VALIDATION_ERROR",
            EngineError::NotFound(_) => "NOT_FOUND",
            EngineError::VersionConflict { .. } => "VERSION_CONFLICT",
            EngineError::InvalidTransition { .. } => "INVALID_TRANSITION",
            EngineError::Backend(_) => "BACKEND_ERROR",
            EngineError::IntegrityFailure(_) => "INTEGRITY_FAILURE",
            EngineError::DecryptionFailure(_) => "DECRYPTION_FAILURE",
            EngineError::GenerationFailed(_) => "GENERATION_FAILED",
            EngineError::RateLimited { .. } => "RATE_LIMITED",
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if matches!(
            self,
            EngineError::Backend(_)
                | EngineError::IntegrityFailure(_)
                | EngineError::DecryptionFailure(_)
        ) {
            tracing::error!(code = self.code(), "{}", self);
        }

        let body = match &self {
            EngineError::InvalidTransition {
                current_state,
                allowed_events,
                ..
            } => ErrorBody {
                code: self.code(),
                error: self.to_string(),
                current_state: Some(current_state.clone()),
                allowed_events: Some(allowed_events.clone()),
                retry_after_ms: None,
            },
            EngineError::RateLimited { retry_after_ms } => ErrorBody {
                code: self.code(),
                error: self.to_string(),
                current_state: None,
                allowed_events: None,
                retry_after_ms: Some(*retry_after_ms),
            },
            _ => ErrorBody {
                code: self.code(),
                error: self.to_string(),
                current_state: None,
                allowed_events: None,
                retry_after_ms: None,
            },
        };

        (status, Json(body)).into_response()
    }
}
