//! Error types for building and executing network calls.
//!
//! # Design
//! `Error` covers failures detected synchronously while a call is being
//! configured: a malformed URL, a missing fixture, a body that cannot be
//! encoded. These are configuration mistakes and surface immediately.
//!
//! `CallError` is what a fired call reports through its outcome. It is
//! `Clone` because a completed call replays the same terminal value to
//! every observer.

use thiserror::Error;

/// Configuration and construction errors.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("invalid HTTP method: {method}")]
    InvalidMethod { method: String },

    #[error("stub response code {code} is not an HTTP status")]
    InvalidStub { code: u16 },

    #[error("fixture {name} could not be loaded: {message}")]
    Fixture { name: String, message: String },

    #[error("missing configuration: {0}")]
    MissingConfig(String),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("transport could not be created: {0}")]
    Transport(#[from] TransportError),
}

/// No response was obtained at all (DNS, connect, timeout).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transport error: {message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A response arrived with a status code of 300 or above.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("server returned {code} for {url}")]
pub struct ServerError {
    pub code: u16,
    pub url: String,
    /// Body delivered alongside the failing status.
    pub body: Vec<u8>,
}

/// Errors delivered through a call's outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Server(#[from] ServerError),

    /// The body of a successful response could not be decoded.
    #[error("response could not be parsed: {0}")]
    Parse(String),
}

impl CallError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            CallError::Server(e) => Some(e.code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_display_mentions_code_and_url() {
        let err = CallError::from(ServerError {
            code: 403,
            url: "https://example.com/login".to_string(),
            body: Vec::new(),
        });
        assert_eq!(err.to_string(), "server returned 403 for https://example.com/login");
        assert_eq!(err.status_code(), Some(403));
    }

    #[test]
    fn transport_error_has_no_status() {
        let err = CallError::from(TransportError::new("connection refused"));
        assert_eq!(err.status_code(), None);
        assert_eq!(err.to_string(), "transport error: connection refused");
    }
}
