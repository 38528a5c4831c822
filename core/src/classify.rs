//! Status classification and pluggable error handling.
//!
//! # Design
//! `classify` is the single place that decides success versus server
//! error. An `ErrorHandler` may then claim a server error (typically by
//! showing the user a message through a `Notifier`). Claimed errors are
//! reported as handled and never reach the call's public error channel.
//! Transport and parse errors are not offered to the handler.

use std::sync::Arc;

use crate::error::ServerError;
use crate::http::HttpResponse;

/// Map a response to `Ok` (status below 300) or a `ServerError`.
pub fn classify(response: HttpResponse) -> Result<HttpResponse, ServerError> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(ServerError {
            code: response.status,
            url: response.url,
            body: response.body,
        })
    }
}

/// Decides whether a server error is dealt with out of band.
pub trait ErrorHandler: Send + Sync {
    /// Returns `true` when the error was handled and must not be re-emitted.
    fn handle(&self, error: &ServerError) -> bool;
}

/// A user-facing message tied to one status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorMessage {
    pub title: String,
    pub message: String,
    pub code: u16,
}

impl ErrorMessage {
    pub fn new(code: u16, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            code,
        }
    }

    pub fn server_issue() -> Self {
        Self::new(
            500,
            "Ruh Roh",
            "Looks like we're having a problem. Please let us know about it!",
        )
    }

    pub fn server_unavailable() -> Self {
        Self::new(
            503,
            "Ruh Roh",
            "The server is unavailable! Try again in a bit. If this keeps happening, please let us know!",
        )
    }
}

/// Side channel used to tell the user about a handled error.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, message: &str);
}

/// Reports notifications as `warn` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, title: &str, message: &str) {
        tracing::warn!(title = %title, text = %message, "user notification");
    }
}

/// Handles every code it has a message for by notifying the user.
#[derive(Clone)]
pub struct DefaultErrorHandler {
    messages: Vec<ErrorMessage>,
    notifier: Arc<dyn Notifier>,
}

impl DefaultErrorHandler {
    /// Handler for 500 and 503 that notifies through `notifier`.
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            messages: vec![ErrorMessage::server_unavailable(), ErrorMessage::server_issue()],
            notifier,
        }
    }

    /// Handler with no messages; claims nothing until some are added.
    pub fn empty(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            messages: Vec::new(),
            notifier,
        }
    }

    /// Add or replace the message for `message.code`.
    pub fn with_message(mut self, message: ErrorMessage) -> Self {
        self.messages.retain(|m| m.code != message.code);
        self.messages.push(message);
        self
    }

    pub fn message_for(&self, code: u16) -> Option<&ErrorMessage> {
        self.messages.iter().find(|m| m.code == code)
    }
}

impl Default for DefaultErrorHandler {
    fn default() -> Self {
        Self::new(Arc::new(TracingNotifier))
    }
}

impl std::fmt::Debug for DefaultErrorHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultErrorHandler")
            .field("messages", &self.messages)
            .finish_non_exhaustive()
    }
}

impl ErrorHandler for DefaultErrorHandler {
    fn handle(&self, error: &ServerError) -> bool {
        match self.message_for(error.code) {
            Some(message) => {
                self.notifier.notify(&message.title, &message.message);
                true
            }
            None => false,
        }
    }
}
