//! HTTP error handling for filedrop.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Error codes surfaced to HTTP clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Bad request (400).
    BadRequest,
    /// Not found (404).
    NotFound,
    /// Internal server error (500).
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// HTTP error type, rendered as a plain-text body.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Create a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    /// Create a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Create an internal server error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// The error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// The client-facing message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.code.status_code(), self.message).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<crate::FiledropError> for ApiError {
    fn from(err: crate::FiledropError) -> Self {
        use crate::FiledropError;

        match &err {
            FiledropError::BadRequest(msg) => ApiError::bad_request(msg.clone()),
            FiledropError::PathEscape(_) => ApiError::bad_request("Invalid path"),
            FiledropError::NotFound(_) => ApiError::not_found("Path not found"),
            FiledropError::ArchiveSecurity(_) => {
                tracing::warn!("Rejected archive: {}", err);
                ApiError::bad_request("Archive contains illegal paths")
            }
            FiledropError::ArchiveIo(_) => {
                tracing::error!("Archive error: {}", err);
                ApiError::internal("Failed to process archive")
            }
            _ => {
                tracing::error!("Internal error: {}", err);
                ApiError::internal("An internal error occurred")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FiledropError;

    #[test]
    fn test_error_code_status() {
        assert_eq!(ErrorCode::BadRequest.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::InternalError.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_from_domain_errors() {
        let cases = [
            (FiledropError::BadRequest("x".into()), ErrorCode::BadRequest),
            (FiledropError::PathEscape("..".into()), ErrorCode::BadRequest),
            (FiledropError::NotFound("x".into()), ErrorCode::NotFound),
            (FiledropError::ArchiveSecurity("x".into()), ErrorCode::BadRequest),
            (FiledropError::ArchiveIo("x".into()), ErrorCode::InternalError),
            (FiledropError::Config("x".into()), ErrorCode::InternalError),
            (
                FiledropError::Io(std::io::Error::other("disk full")),
                ErrorCode::InternalError,
            ),
        ];

        for (err, code) in cases {
            assert_eq!(ApiError::from(err).code(), code);
        }
    }

    #[test]
    fn test_internal_message_is_generic() {
        let err = ApiError::from(FiledropError::Io(std::io::Error::other("/secret/path")));
        assert!(!err.message().contains("/secret/path"));
    }

    #[test]
    fn test_into_response_status() {
        let response = ApiError::not_found("Path not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
