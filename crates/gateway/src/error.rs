//! HTTP-level errors and their mapping onto the gateway port taxonomy.

use storeledger_core::gateway::GatewayError;
use thiserror::Error;

/// Errors raised while talking to the gateway.
#[derive(Debug, Error)]
pub enum HttpError {
    /// No response within the configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// The connection could not be established or broke.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The gateway answered with a 5xx status.
    #[error("Server error {status}: {body}")]
    ServerError {
        /// HTTP status.
        status: u16,
        /// Response body or envelope message.
        body: String,
    },

    /// The gateway refused the request (4xx).
    #[error("Request rejected ({status}): {message}")]
    Rejected {
        /// HTTP status.
        status: u16,
        /// Envelope message, or the raw body.
        message: String,
    },

    /// A 2xx response whose envelope reports `"status": "error"`.
    #[error("Gateway reported an error: {0}")]
    Envelope(String),

    /// The response body did not have the expected shape.
    #[error("Could not decode response: {0}")]
    Decode(String),

    /// Every attempt of a retried request failed.
    #[error("Max retries exceeded after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded {
        /// Number of attempts made.
        attempts: u32,
        /// Last error seen.
        last_error: String,
    },
}

impl From<reqwest::Error> for HttpError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() || err.is_body() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<HttpError> for GatewayError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Timeout => Self::Timeout(err.to_string()),
            HttpError::Transport(_)
            | HttpError::ServerError { .. }
            | HttpError::MaxRetriesExceeded { .. } => Self::Unavailable(err.to_string()),
            HttpError::Rejected { message, .. } | HttpError::Envelope(message) => {
                Self::Rejected(message)
            }
            HttpError::Decode(msg) => Self::InvalidResponse(msg),
        }
    }
}
