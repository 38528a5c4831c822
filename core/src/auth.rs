//! Authenticated JSON calls.

use std::sync::{Arc, RwLock};

use crate::call::{HeaderDecorator, NetworkCallBuilder};
use crate::error::Error;
use crate::http::Headers;
use crate::json::JsonCall;

/// Name of the header carrying the API key.
pub const AUTH_HEADER: &str = "Auth";

/// Source of the current API key.
pub trait CredentialProvider: Send + Sync {
    fn current_api_key(&self) -> Option<String>;
}

/// In-memory credential store, updated after login and cleared on logout.
#[derive(Debug, Default)]
pub struct StaticCredentials {
    api_key: RwLock<Option<String>>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            api_key: RwLock::new(Some(key.into())),
        }
    }

    pub fn set(&self, key: impl Into<String>) {
        *self.api_key.write().unwrap_or_else(|e| e.into_inner()) = Some(key.into());
    }

    pub fn clear(&self) {
        *self.api_key.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

impl CredentialProvider for StaticCredentials {
    fn current_api_key(&self) -> Option<String> {
        self.api_key.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Sets the `Auth` header from a provider when a key is available.
///
/// The key is read each time a request is built, so a call picks up the
/// key that is current when it fires.
#[derive(Clone)]
pub struct AuthHeader {
    credentials: Arc<dyn CredentialProvider>,
}

impl AuthHeader {
    pub fn new(credentials: Arc<dyn CredentialProvider>) -> Self {
        Self { credentials }
    }
}

impl HeaderDecorator for AuthHeader {
    fn decorate(&self, headers: &mut Headers) {
        if let Some(key) = self.credentials.current_api_key() {
            headers.insert(AUTH_HEADER, key);
        }
    }
}

impl JsonCall {
    /// A JSON call that also carries the current API key, if any.
    pub fn authenticated(
        builder: NetworkCallBuilder,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, Error> {
        JsonCall::new(builder.decorate(AuthHeader::new(credentials)))
    }
}
