//! Error handling and custom error types
//!
//! Every failure the client can surface is one variant of [`Error`]. Failures
//! are classified once, where they are detected, and callers branch on the
//! variant.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Empty prompt, blank cookie, or another argument rejected before any I/O.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Backend answered 401, or the session handshake rejected the cookie.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Backend answered 429. Never retried.
    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited {
        /// Seconds to wait, when the backend sent `Retry-After`.
        retry_after: Option<u64>,
    },

    #[error("Request timed out after {} seconds", .0.as_secs_f32())]
    Timeout(Duration),

    #[error("Server responded with invalid response ({status}): {body}")]
    ServerError { status: u16, body: String },

    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the retry loop may issue another attempt after this failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::ServerError { .. } | Error::NetworkFailure(_))
    }

    /// HTTP status a request handler should answer with for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Unauthorized(_) => 401,
            Error::RateLimited { .. } => 429,
            _ => 500,
        }
    }

    pub(crate) fn from_transport(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Error::Timeout(timeout)
        } else {
            Error::NetworkFailure(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
