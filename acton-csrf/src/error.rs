//! Error types and HTTP response conversion

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the crate
///
/// Token validation failures are not errors: they are answered by the
/// configured error handler. Variants here signal that the application is
/// misconfigured or that the session store failed.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// Configuration loaded but holds an unusable value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The middleware ran without an active session
    #[error("CSRF middleware failed. Session is not started.")]
    SessionInactive,

    /// Session store error
    #[error("Session error: {0}")]
    Session(String),

    /// A handler asked for the CSRF token but the middleware did not run
    #[error("CSRF token not found in request extensions")]
    TokenUnavailable,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The global tracing subscriber could not be installed
    #[error("Tracing initialization failed: {0}")]
    Tracing(String),
}

impl Error {
    /// Whether the error signals a misconfigured application rather than a
    /// transient failure.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::InvalidConfig(_) | Self::SessionInactive | Self::TokenUnavailable
        )
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,

    /// Optional error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// HTTP status code
    pub status: u16,
}

impl ErrorResponse {
    /// Create a new error response
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: None,
            status: status.as_u16(),
        }
    }

    /// Create error response with a code
    pub fn with_code(
        status: StatusCode,
        code: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            error: error.into(),
            code: Some(code.into()),
            status: status.as_u16(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        let error_response = match self {
            Error::Config(e) => ErrorResponse::with_code(status, "CONFIG_ERROR", e.to_string()),
            Error::InvalidConfig(msg) => ErrorResponse::with_code(status, "CONFIG_ERROR", msg),
            Error::SessionInactive => {
                tracing::error!("CSRF middleware invoked without an active session");
                ErrorResponse::with_code(
                    status,
                    "SESSION_NOT_STARTED",
                    "Session is not started",
                )
            }
            Error::Session(msg) => {
                tracing::error!("Session error: {}", msg);
                ErrorResponse::with_code(status, "SESSION_ERROR", "Session operation failed")
            }
            Error::TokenUnavailable => ErrorResponse::with_code(
                status,
                "CSRF_TOKEN_UNAVAILABLE",
                "CSRF token is not available for this request",
            ),
            Error::Io(e) => {
                tracing::error!("I/O error: {}", e);
                ErrorResponse::with_code(status, "IO_ERROR", "Internal server error")
            }
            Error::Tracing(msg) => {
                ErrorResponse::with_code(status, "TRACING_ERROR", msg)
            }
        };

        (status, Json(error_response)).into_response()
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

impl From<tower_sessions::session::Error> for Error {
    fn from(err: tower_sessions::session::Error) -> Self {
        Error::Session(err.to_string())
    }
}
