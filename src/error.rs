use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Main error type for the Tern rate limiting service
#[derive(Debug)]
pub enum TernError {
    /// Configuration or CLI argument errors
    Config(String),

    /// Caller contract violations rejected at the boundary
    Validation(String),

    /// Peer push or receive failures
    Transport(String),

    /// Serialization/deserialization errors
    Serialization(serde_json::Error),

    /// Internal lock poisoning or concurrency errors
    Concurrency(String),
}

impl fmt::Display for TernError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TernError::Config(msg) => write!(f, "Configuration error: {}", msg),
            TernError::Validation(msg) => write!(f, "Validation error: {}", msg),
            TernError::Transport(msg) => write!(f, "Transport error: {}", msg),
            TernError::Serialization(err) => write!(f, "Serialization error: {}", err),
            TernError::Concurrency(msg) => write!(f, "Concurrency error: {}", msg),
        }
    }
}

impl std::error::Error for TernError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TernError::Serialization(err) => Some(err),
            _ => None,
        }
    }
}

// Convenient type alias for Results using our error type
pub type Result<T> = std::result::Result<T, TernError>;

impl TernError {
    /// Get the appropriate HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            TernError::Config(_) => StatusCode::BAD_REQUEST,
            TernError::Validation(_) => StatusCode::BAD_REQUEST,
            TernError::Transport(_) => StatusCode::BAD_GATEWAY,
            TernError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            TernError::Concurrency(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error type identifier
    pub fn error_type(&self) -> &'static str {
        match self {
            TernError::Config(_) => "configuration_error",
            TernError::Validation(_) => "validation_error",
            TernError::Transport(_) => "transport_error",
            TernError::Serialization(_) => "serialization_error",
            TernError::Concurrency(_) => "concurrency_error",
        }
    }
}

// Axum IntoResponse implementation for HTTP error responses
impl IntoResponse for TernError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let error_response = json!({
            "error": {
                "code": status_code.as_u16(),
                "message": self.to_string(),
                "type": self.error_type(),
            }
        });

        (status_code, Json(error_response)).into_response()
    }
}

// Conversions from common error types
impl From<serde_json::Error> for TernError {
    fn from(err: serde_json::Error) -> Self {
        TernError::Serialization(err)
    }
}

impl From<reqwest::Error> for TernError {
    fn from(err: reqwest::Error) -> Self {
        TernError::Transport(err.to_string())
    }
}

impl From<url::ParseError> for TernError {
    fn from(err: url::ParseError) -> Self {
        TernError::Config(format!("Invalid URL: {}", err))
    }
}
