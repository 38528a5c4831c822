//! Composable HTTP calls with transparent stubbing.
//!
//! # Overview
//! A `NetworkCall` is built from a shared `ServerConfiguration`, an
//! endpoint, a method, headers and an optional body. Firing it either hands
//! the request to a `Transport` or, when the configuration asks for stubs
//! and the call carries a `StubDescriptor`, answers with the canned
//! response. Either way the caller observes the same `Outcome`.
//!
//! # Design
//! - Behavior is composed, not inherited: `JsonCall` adds JSON headers and
//!   decoding, `JsonCall::authenticated` adds the `Auth` header, `LoginCall`
//!   fixes endpoint, method and body.
//! - The network sits behind the `Transport` trait; `ReqwestTransport` is
//!   the default implementation.
//! - Stub interceptions are registered per call id and removed when the
//!   call finishes, so concurrent calls to the same URL stay independent.
//! - Outcomes are a tagged union (success, failed, handled) published on a
//!   `watch` channel.

pub mod auth;
pub mod call;
pub mod classify;
pub mod config;
pub mod error;
pub mod http;
pub mod intercept;
pub mod json;
pub mod login;
pub mod stub;
pub mod transport;

pub use auth::{AuthHeader, CredentialProvider, StaticCredentials, AUTH_HEADER};
pub use call::{CallHandle, CallState, HeaderDecorator, NetworkCall, NetworkCallBuilder, Outcome};
pub use classify::{classify, DefaultErrorHandler, ErrorHandler, ErrorMessage, Notifier, TracingNotifier};
pub use config::ServerConfiguration;
pub use error::{CallError, Error, ServerError, TransportError};
pub use http::{Headers, HttpMethod, HttpRequest, HttpResponse};
pub use intercept::{Interception, StubRegistry};
pub use json::{json_headers, JsonCall, JsonHandle, JsonHeaders};
pub use login::{LoginCall, LoginSuccess, LOGIN_ENDPOINT};
pub use stub::{DirFixtureLoader, FixtureLoader, MemoryFixtureLoader, StubDescriptor};
pub use transport::Transport;
#[cfg(feature = "reqwest")]
pub use transport::{ReqwestTransport, TransportConfig};
