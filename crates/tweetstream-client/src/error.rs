//! Error types for stream client operations

use std::time::Duration;

use thiserror::Error;
use tweetstream_core::{DecodeError, EventKind};

/// Result type alias for stream client operations
pub type Result<T> = std::result::Result<T, StreamClientError>;

/// Hard failures surfaced to the caller
///
/// These are the only errors that escape the stream: construction-time
/// validation and reconnect exhaustion. Everything that goes wrong with a
/// single message is a [`StreamError`] and goes to the error handler.
#[derive(Error, Debug)]
pub enum StreamClientError {
    /// Credentials are malformed or incomplete
    #[error("Invalid credentials: {0}")]
    AuthValidation(String),

    /// The operation needs OAuth credentials but another mode is configured
    #[error("{operation} requires OAuth credentials")]
    InvalidAuthMode { operation: &'static str },

    /// Request parameters were rejected before connecting
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// All reconnect attempts failed
    #[error("Gave up reconnecting after {retries} retries (last delay {timeout:?})")]
    ReconnectExhausted { timeout: Duration, retries: u32 },

    /// HTTP client could not be built
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// The background stream task died
    #[error("Stream task failed: {0}")]
    TaskFailed(String),
}

impl StreamClientError {
    /// Whether this error ended a running stream (as opposed to rejecting a call)
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ReconnectExhausted { .. } | Self::TaskFailed(_))
    }
}

/// Per-message errors delivered to the error handler
///
/// None of these interrupt the stream.
#[derive(Error, Debug)]
pub enum StreamError {
    /// A frame could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// A decoded message matched no known shape
    #[error("Unclassified message: {0}")]
    Unclassified(String),

    /// A registered handler panicked
    #[error("{kind} handler panicked: {message}")]
    HandlerPanicked { kind: String, message: String },
}

impl StreamError {
    pub(crate) fn handler_panicked(kind: EventKind, message: String) -> Self {
        Self::HandlerPanicked {
            kind: kind.to_string(),
            message,
        }
    }
}

/// Transient connection failures
///
/// The supervisor retries all of these under the backoff policy.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// Could not establish the connection
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Server answered with a non-success status
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    /// No bytes arrived within the idle window
    #[error("No data received for {0:?}")]
    IdleTimeout(Duration),

    /// Server closed the stream
    #[error("Stream closed by server")]
    Closed,

    /// Error while reading the body
    #[error("Read error: {0}")]
    Read(String),
}

impl TransportError {
    /// Whether the server explicitly rejected the credentials
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Http { status: 401, .. })
    }

    /// Whether the server asked us to slow down
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Http { status: 420 | 429, .. })
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() || e.is_builder() || e.is_request() {
            Self::Connect(e.to_string())
        } else {
            Self::Read(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let exhausted = StreamClientError::ReconnectExhausted {
            timeout: Duration::from_secs(1),
            retries: 3,
        };
        assert!(exhausted.is_fatal());
        assert!(!StreamClientError::InvalidAuthMode { operation: "user_stream" }.is_fatal());
        assert!(exhausted.to_string().contains("3 retries"));
    }

    #[test]
    fn test_http_status_helpers() {
        let e = TransportError::Http {
            status: 420,
            message: "Enhance Your Calm".into(),
        };
        assert!(e.is_rate_limited());
        assert!(!e.is_unauthorized());
    }
}
