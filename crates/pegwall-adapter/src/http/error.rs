/*
[INPUT]:  Error sources (HTTP, reported errors, serialization, URL parsing)
[OUTPUT]: Structured error types with context and retry hints
[POS]:    Error handling layer - reference server and price feed calls
[UPDATE]: When adding new error sources or improving error messages
*/

use reqwest::StatusCode;
use thiserror::Error;

/// Error returned by HTTP collaborators (reference server, price feed).
#[derive(Error, Debug)]
pub enum HttpError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("HTTP status {code}: {body}")]
    Status { code: u16, body: String },

    /// Server reported an error in the response body
    #[error("{error}: {message}")]
    Reported { error: String, message: String },

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Invalid response from server
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl HttpError {
    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            HttpError::Http(_) | HttpError::Serialization(_) | HttpError::InvalidResponse(_) => {
                true
            }
            HttpError::Status { code, .. } => {
                *code == StatusCode::TOO_MANY_REQUESTS.as_u16() || *code >= 500
            }
            HttpError::Reported { .. } | HttpError::UrlParse(_) => false,
        }
    }

    /// Human readable message, as logged by the control loop.
    pub fn message(&self) -> String {
        match self {
            HttpError::Reported { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn status(status: StatusCode, body: impl Into<String>) -> Self {
        HttpError::Status {
            code: status.as_u16(),
            body: body.into(),
        }
    }
}

/// Result type alias for HTTP collaborators
pub type Result<T> = std::result::Result<T, HttpError>;
