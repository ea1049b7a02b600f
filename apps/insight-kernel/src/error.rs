use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KernelError {
    #[error("Run not found: {0}")]
    RunNotFound(String),
    #[error("Run {run_id} would exceed the limit of {limit} events")]
    EventLimitExceeded { run_id: String, limit: usize },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl KernelError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            KernelError::RunNotFound(_) => StatusCode::NOT_FOUND,
            KernelError::EventLimitExceeded { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            KernelError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for KernelError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::warn!("{}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
