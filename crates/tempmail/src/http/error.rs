//! Error responses.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// A request failure, rendered as `{"success": false, "error": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request is malformed (400).
    #[error("{0}")]
    BadRequest(String),

    /// Credentials are missing or wrong (401).
    #[error("{0}")]
    Unauthorized(String),

    /// The addressed resource does not exist (404).
    #[error("{0}")]
    NotFound(String),

    /// The server failed to answer (500).
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Shorthand for [`ApiError::Unauthorized`].
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    /// Shorthand for [`ApiError::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// The HTTP status of this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "success": false, "error": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}

impl From<tempmail_core::Error> for ApiError {
    fn from(err: tempmail_core::Error) -> Self {
        use tempmail_core::Error;

        match err {
            Error::InvalidArgument(message) => Self::BadRequest(message),
            Error::InvalidCursor(message) => Self::BadRequest(format!("Invalid cursor: {message}")),
            Error::UnsupportedDomain(_) => Self::not_found("Domain not supported"),
            Error::Database(e) => {
                error!("Database error: {e}");
                Self::Internal("Database error".to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_mapping() {
        let cases = [
            (
                tempmail_core::Error::invalid_argument("bad"),
                StatusCode::BAD_REQUEST,
            ),
            (
                tempmail_core::Error::InvalidCursor("bad".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                tempmail_core::Error::UnsupportedDomain("example.com".to_string()),
                StatusCode::NOT_FOUND,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_response_status() {
        let response = ApiError::unauthorized("Invalid API key").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
