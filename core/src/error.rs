//! Error types for the API client.
//!
//! # Design
//! Three failure families reach callers: the round-trip itself failed
//! (`Transport`), the response could not be turned into the requested type
//! (`Decode`), or the request payload could not be encoded (`Encode`).
//! Typed calls additionally surface non-2xx responses as `Status` so an error
//! document is never decoded as a success value. None of these are recovered
//! locally; the facade reports and returns them unchanged.

use thiserror::Error;

/// Errors returned by `ApiClient` operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced a complete response.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The response body could not be deserialized into the expected type.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The request payload could not be serialized to JSON.
    #[error("failed to encode request payload: {0}")]
    Encode(#[source] serde_json::Error),

    /// A typed call received a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Status { status: 404, .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Transport(TransportError::Timeout))
    }
}

/// Failures of the HTTP round-trip: connect, DNS, timeout, body read.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("HTTP request error: {0}")]
    Request(String),

    /// The shared HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Build(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    /// The response carried no body (or only whitespace).
    #[error("response body is empty")]
    EmptyBody,

    #[error("malformed response body: {0}")]
    Malformed(#[source] serde_json::Error),
}

/// Invalid values in environment-provided configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid timeout {0:?}: expected a positive number of seconds")]
    InvalidTimeout(String),
}
