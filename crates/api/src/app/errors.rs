use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use codecamp_core::DomainError;
use codecamp_infra::StoreError;

/// Body of every 500 response. Store details only go to the log.
pub const INTERNAL_ERROR_MESSAGE: &str = "It's not you, it's us";

/// Handler error. Bodies are plain text; callers distinguish failures by status code.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{operation} failed: {source}")]
    Internal {
        operation: &'static str,
        #[source]
        source: StoreError,
    },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Map a repository failure raised while running `operation`.
    pub fn from_store(operation: &'static str, err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(_) => Self::bad_request("record already exists"),
            StoreError::MissingReference(_) => {
                Self::bad_request("referenced record does not exist")
            }
            StoreError::NothingSaved(_) => Self::Conflict("no changes were saved".to_string()),
            source @ StoreError::Backend(_) => Self::Internal { operation, source },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// `map_err` adapter for repository calls.
pub fn store_failure(operation: &'static str) -> impl FnOnce(StoreError) -> ApiError {
    move |err| {
        tracing::debug!(operation, error = %err, "repository call failed");
        ApiError::from_store(operation, err)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::Internal { operation, source } => {
                tracing::error!(operation, error = %source, "request failed");
                (status, INTERNAL_ERROR_MESSAGE).into_response()
            }
            Self::BadRequest(message) | Self::NotFound(message) | Self::Conflict(message) => {
                tracing::debug!(status = status.as_u16(), %message, "request rejected");
                (status, message).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_status_codes() {
        let cases = [
            (StoreError::Duplicate("x".into()), StatusCode::BAD_REQUEST),
            (StoreError::MissingReference("x".into()), StatusCode::BAD_REQUEST),
            (StoreError::NothingSaved("x".into()), StatusCode::CONFLICT),
            (StoreError::Backend("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from_store("test", err).status(), expected);
        }
    }

    #[test]
    fn domain_errors_are_bad_requests() {
        let err = ApiError::from(DomainError::validation("name is required"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "validation failed: name is required");
    }

    #[test]
    fn internal_errors_hide_the_cause() {
        let response = ApiError::from_store("list_camps", StoreError::Backend("db down".into()))
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
