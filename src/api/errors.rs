use crate::errors::{StoreError, TaskError};
use crate::llm::InferenceError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub message: String,
    pub code: u16,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiError({}, {})", self.code, self.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::Json(self);
        (status, body).into_response()
    }
}

impl From<TaskError> for ApiError {
    fn from(err: TaskError) -> Self {
        let status = match &err {
            TaskError::InvalidInput(_) | TaskError::InvalidJsonOutput(_) => StatusCode::BAD_REQUEST,
            TaskError::DependencyNotSatisfied { .. } | TaskError::InvalidTransition { .. } => {
                StatusCode::CONFLICT
            }
            TaskError::Store(store) => store_status(store),
            TaskError::Inference(inference) => inference_status(inference),
        };
        api_error(status, &err.to_string())
    }
}

fn store_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        StoreError::AgentInUse(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn inference_status(err: &InferenceError) -> StatusCode {
    match err {
        InferenceError::InvalidCredential => StatusCode::BAD_REQUEST,
        InferenceError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        InferenceError::Cancelled | InferenceError::QueueClosed => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::BAD_GATEWAY,
    }
}

/// Helper function to create API errors
pub fn api_error(status: StatusCode, message: &str) -> ApiError {
    ApiError {
        message: message.to_string(),
        code: status.as_u16(),
    }
}
