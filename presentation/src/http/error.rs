//! HTTP error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use lens_application::AnalysisError;
use lens_domain::JobError;
use serde_json::json;
use tracing::error;

/// Error returned by API handlers, rendered as `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Unavailable(String),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(m)
            | ApiError::NotFound(m)
            | ApiError::Unavailable(m)
            | ApiError::Internal(m) => m,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(message) = &self {
            error!("Internal error: {}", message);
        }
        (self.status(), Json(json!({ "error": self.message() }))).into_response()
    }
}

impl From<AnalysisError> for ApiError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::InvalidRequest(_) | AnalysisError::ModelUnavailable(_) => {
                ApiError::BadRequest(err.to_string())
            }
            AnalysisError::Cancelled => ApiError::Unavailable(err.to_string()),
            AnalysisError::Aborted(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::InvalidRequest(_) => ApiError::BadRequest(err.to_string()),
            JobError::NotFound(_) => ApiError::NotFound(err.to_string()),
            JobError::QueueClosed => ApiError::Unavailable(err.to_string()),
            JobError::IllegalTransition { .. } => ApiError::Internal(err.to_string()),
        }
    }
}
