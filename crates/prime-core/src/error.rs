//! Error types for Prime Infrastructure operations.
//!
//! Every failure that the connector cannot recover from by retrying is surfaced as an
//! [`Error`] so callers decide whether to abort, rather than the process exiting underneath them.

use thiserror::Error;

/// Main error type for Prime Infrastructure operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The server rejected the supplied credentials (HTTP 401)
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The retry budget was spent on throttled or forbidden responses
    #[error("Retry budget exhausted after {attempts} attempts: {method} {url}")]
    RetryExhausted {
        /// HTTP verb of the abandoned request
        method: String,
        /// URL of the abandoned request
        url: String,
        /// Number of attempts made
        attempts: u32,
    },

    /// The server answered with a non-retryable error status
    #[error("Request failed with status {status}: {message}")]
    RequestFailed {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// The server could not be reached
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Operation timed out
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Any other transport-level failure
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Response body was not the expected JSON
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Response JSON lacked a field the operation consumes
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// A job run finished with a status that is neither `SUCCESS` nor `FAILURE`
    #[error("Unrecognized job result status: {0}")]
    UnknownJobResult(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Invalid endpoint
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Writing output failed
    #[error("I/O error: {0}")]
    IoError(String),
}

/// Specialized result type for Prime Infrastructure operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed(_) => "AUTHENTICATION_FAILED",
            Self::RetryExhausted { .. } => "RETRY_EXHAUSTED",
            Self::RequestFailed { .. } => "REQUEST_FAILED",
            Self::ConnectionFailed(_) => "CONNECTION_FAILED",
            Self::Timeout(_) => "TIMEOUT",
            Self::HttpError(_) => "HTTP_ERROR",
            Self::ParseError(_) => "PARSE_ERROR",
            Self::UnexpectedResponse(_) => "UNEXPECTED_RESPONSE",
            Self::UnknownJobResult(_) => "UNKNOWN_JOB_RESULT",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::InvalidEndpoint(_) => "INVALID_ENDPOINT",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::IoError(_) => "IO_ERROR",
        }
    }

    /// HTTP status code associated with this error, if the server sent one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::AuthenticationFailed(_) => Some(401),
            Self::RequestFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true if the failure happened below HTTP (no status was received).
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed(_) | Self::Timeout(_) | Self::HttpError(_)
        )
    }
}

// Conversions from external error types
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::ConnectionFailed(err.to_string())
        } else if err.is_decode() {
            Self::ParseError(err.to_string())
        } else {
            Self::HttpError(err.to_string())
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidEndpoint(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ValidationError(err.to_string())
    }
}
