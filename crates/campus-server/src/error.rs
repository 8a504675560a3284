use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use campus_store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("{0}")]
    AlreadyDone(String),

    #[error("Invalid OTP")]
    InvalidCode,

    #[error("OTP expired")]
    Expired,

    #[error("Email domain not allowed: {0}")]
    DomainNotAllowed(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Too many requests")]
    RateLimited,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::PreconditionFailed(_)
            | ApiError::AlreadyDone(_)
            | ApiError::InvalidCode => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Expired | ApiError::DomainNotAllowed(_) | ApiError::Forbidden(_) => {
                StatusCode::FORBIDDEN
            }
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "request failed");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound("Record".to_string()),
            StoreError::PreconditionFailed(reason) => ApiError::PreconditionFailed(reason),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

/// Name the missing record when a store call comes back empty.
pub trait StoreResultExt<T> {
    fn or_not_found(self, what: &str) -> Result<T, ApiError>;
}

impl<T> StoreResultExt<T> for Result<T, StoreError> {
    fn or_not_found(self, what: &str) -> Result<T, ApiError> {
        self.map_err(|e| match e {
            StoreError::NotFound => ApiError::NotFound(what.to_string()),
            other => other.into(),
        })
    }
}
