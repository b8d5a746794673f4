use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::{Display, Error};

use crate::model::leave_request::LeaveStatus;

/// Engine-level failures. A failed operation never leaves a partial
/// mutation behind; `ConcurrencyConflict` is the caller's retry signal.
#[derive(Debug, Display, Error)]
pub enum EngineError {
    #[display(fmt = "validation failed: {}", _0)]
    Validation(#[error(not(source))] String),

    #[display(fmt = "cannot {} a request in status {}", trigger, from)]
    InvalidTransition {
        trigger: &'static str,
        from: LeaveStatus,
    },

    #[display(fmt = "{} not found", _0)]
    NotFound(#[error(not(source))] String),

    #[display(fmt = "lost a concurrent update race, retry the operation")]
    ConcurrencyConflict,

    #[display(fmt = "storage error: {}", _0)]
    Storage(#[error(not(source))] String),
}

impl EngineError {
    fn code(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "validation_error",
            EngineError::InvalidTransition { .. } => "invalid_transition",
            EngineError::NotFound(_) => "not_found",
            EngineError::ConcurrencyConflict => "concurrency_conflict",
            EngineError::Storage(_) => "storage_error",
        }
    }
}

impl ResponseError for EngineError {
    fn status_code(&self) -> StatusCode {
        match self {
            EngineError::Validation(_) => StatusCode::BAD_REQUEST,
            EngineError::InvalidTransition { .. } => StatusCode::CONFLICT,
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::ConcurrencyConflict => StatusCode::CONFLICT,
            EngineError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Storage details go to the log, not to the caller.
        let message = match self {
            EngineError::Storage(detail) => {
                tracing::error!(error = %detail, "storage failure");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.code(),
            "message": message,
        }))
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(e: sqlx::Error) -> Self {
        EngineError::Storage(e.to_string())
    }
}
