use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use thiserror::Error;

/// Error taxonomy for the session orchestrator.
///
/// Variants map onto distinct caller-visible failure classes; the HTTP
/// layer converts them to status codes via `IntoResponse`.
#[derive(Debug, Error)]
pub enum FrontdeskError {
    #[error("session {0} not found")]
    NotFound(String),

    #[error("session {0} already exists")]
    Duplicate(String),

    #[error("upstream request failed with status {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("audio source unavailable: {0}")]
    ResourceAcquisition(String),

    #[error("realtime transport failed: {0}")]
    Transport(String),

    #[error("{0}")]
    Validation(String),

    #[error("missing configuration: {0}")]
    Misconfigured(String),
}

impl FrontdeskError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            FrontdeskError::NotFound(_) => StatusCode::NOT_FOUND,
            FrontdeskError::Duplicate(_) => StatusCode::CONFLICT,
            FrontdeskError::Validation(_) => StatusCode::BAD_REQUEST,
            FrontdeskError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            FrontdeskError::ResourceAcquisition(_)
            | FrontdeskError::Transport(_)
            | FrontdeskError::Misconfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for FrontdeskError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
