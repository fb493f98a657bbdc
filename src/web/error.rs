//! API error handling for the Chorely web layer.
//!
//! Errors travel as a flat body `{"error": "<message>"}` so clients can
//! surface the message directly.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::ExchangeError;

/// Error kinds in the wire taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing input, detected before any I/O (400).
    InvalidRequest,
    /// Bad credential (401).
    Unauthorized,
    /// Valid credential but wrong role or ownership (403).
    Forbidden,
    /// Referenced entity absent (404).
    NotFound,
    /// A collaborator call failed or timed out (502).
    Upstream,
    /// Unexpected (500).
    Internal,
}

impl ErrorKind {
    /// Get the HTTP status code for this kind.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Flat API error body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable message.
    pub error: String,
}

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// The error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Create an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, message)
    }

    /// Create an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    /// Create a forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    /// Create a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create an upstream failure error.
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Upstream, message)
    }

    /// Create an internal server error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.kind.status_code();
        let body = ErrorBody {
            error: self.message,
        };
        (status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<crate::ChorelyError> for ApiError {
    fn from(err: crate::ChorelyError) -> Self {
        match &err {
            crate::ChorelyError::Auth(msg) => ApiError::unauthorized(msg.clone()),
            crate::ChorelyError::Permission(msg) => ApiError::forbidden(msg.clone()),
            crate::ChorelyError::NotFound(_) => ApiError::not_found(err.to_string()),
            crate::ChorelyError::Validation(msg) => ApiError::invalid_request(msg.clone()),
            _ => {
                tracing::error!("Internal error: {}", err);
                ApiError::internal("An internal error occurred")
            }
        }
    }
}

impl From<ExchangeError> for ApiError {
    fn from(err: ExchangeError) -> Self {
        match &err {
            ExchangeError::MissingCredentials | ExchangeError::MalformedPin => {
                ApiError::invalid_request(err.to_string())
            }
            ExchangeError::InvalidCredentials => ApiError::unauthorized(err.to_string()),
            ExchangeError::KidsOnly => ApiError::forbidden(err.to_string()),
            ExchangeError::Lookup(detail) => {
                tracing::error!(detail = %detail, "user lookup failed during PIN exchange");
                ApiError::upstream("Authentication service unavailable")
            }
            ExchangeError::Issuance(detail) => {
                tracing::error!(detail = %detail, "token issuance failed during PIN exchange");
                ApiError::internal("An internal error occurred")
            }
        }
    }
}
