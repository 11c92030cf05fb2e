//! JSON error bodies shared by the flow and session routes.

use crate::vibe::{DriverError, FlowError, TransitionError};
use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::warn;

use super::metrics;

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    kind: &'static str,
    message: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_input", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!("{} ({}): {}", self.status, self.kind, self.message);
        }
        metrics::record_error(self.kind, self.status.as_str());

        let body = ApiErrorBody {
            kind: self.kind,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid_input(rejection.body_text())
    }
}

/// Only session ids are taken from the path, so a malformed one names no session.
impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::new(StatusCode::NOT_FOUND, "not_found", rejection.body_text())
    }
}

impl From<FlowError> for ApiError {
    fn from(err: FlowError) -> Self {
        let status = match &err {
            FlowError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            e if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            FlowError::SchemaValidation(_) | FlowError::Transport(_) => StatusCode::BAD_GATEWAY,
        };
        ApiError::new(status, err.kind(), err.to_string())
    }
}

impl From<TransitionError> for ApiError {
    fn from(err: TransitionError) -> Self {
        let (status, kind) = match &err {
            TransitionError::Invalid { .. } => (StatusCode::CONFLICT, "invalid_transition"),
            TransitionError::Busy => (StatusCode::CONFLICT, "busy"),
            TransitionError::UnknownOption(_) | TransitionError::EmptyMessage => {
                (StatusCode::BAD_REQUEST, "invalid_input")
            }
        };
        ApiError::new(status, kind, err.to_string())
    }
}

impl From<DriverError> for ApiError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::SessionNotFound(id) => ApiError::new(
                StatusCode::NOT_FOUND,
                "not_found",
                DriverError::SessionNotFound(id).to_string(),
            ),
            DriverError::Transition(e) => e.into(),
        }
    }
}
