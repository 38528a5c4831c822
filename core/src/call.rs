//! The network call: request building, execution and outcome delivery.
//!
//! # Design
//! A `NetworkCall` is assembled by `NetworkCallBuilder` from a shared
//! `ServerConfiguration`, an endpoint, a method, headers and an optional
//! body. Extra behavior is attached as capabilities rather than subtypes:
//! `HeaderDecorator`s run when the request is built, a `StubDescriptor`
//! swaps the transport for a canned response, an `ErrorHandler` may claim
//! server errors.
//!
//! `fire` consumes the call, so a call can only ever be fired once. The
//! lifecycle runs on a tokio task:
//!
//! ```text
//! Firing -> Stubbed | Dispatched -> Completed(Success | Failed | Handled)
//!        \-> Cancelled (from any non-terminal state)
//! ```
//!
//! State is published on a `watch` channel, so every observer (including
//! one that subscribes after completion) sees the latest state.

use std::sync::{Arc, Weak};

use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::Instrument;
use uuid::Uuid;

use crate::classify::{classify, ErrorHandler};
use crate::config::ServerConfiguration;
use crate::error::{CallError, Error, ServerError, TransportError};
use crate::http::{Headers, HttpMethod, HttpRequest, HttpResponse};
use crate::intercept::StubRegistry;
use crate::stub::{DirFixtureLoader, FixtureLoader, StubDescriptor};
use crate::transport::Transport;

/// Adjusts request headers each time a request is built.
pub trait HeaderDecorator: Send + Sync {
    fn decorate(&self, headers: &mut Headers);
}

/// Terminal result of a fired call.
///
/// `Handled` carries a server error that an `ErrorHandler` claimed; it is
/// not reported through `error()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T = HttpResponse> {
    Success(T),
    Failed(CallError),
    Handled(ServerError),
}

impl<T> Outcome<T> {
    pub fn success(&self) -> Option<&T> {
        match self {
            Outcome::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_success(self) -> Option<T> {
        match self {
            Outcome::Success(value) => Some(value),
            _ => None,
        }
    }

    /// The error visible to callers. `None` for handled errors.
    pub fn error(&self) -> Option<&CallError> {
        match self {
            Outcome::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// The server error behind this outcome, handled or not.
    pub fn server_error(&self) -> Option<&ServerError> {
        match self {
            Outcome::Failed(CallError::Server(err)) | Outcome::Handled(err) => Some(err),
            _ => None,
        }
    }

    /// Body delivered with a non-success status.
    pub fn error_body(&self) -> Option<&[u8]> {
        self.server_error().map(|err| err.body.as_slice())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_handled(&self) -> bool {
        matches!(self, Outcome::Handled(_))
    }

    /// Transform the success value; a failing transform becomes `Failed`.
    pub fn and_then<U>(self, f: impl FnOnce(T) -> Result<U, CallError>) -> Outcome<U> {
        match self {
            Outcome::Success(value) => match f(value) {
                Ok(mapped) => Outcome::Success(mapped),
                Err(err) => Outcome::Failed(err),
            },
            Outcome::Failed(err) => Outcome::Failed(err),
            Outcome::Handled(err) => Outcome::Handled(err),
        }
    }
}

impl Outcome<HttpResponse> {
    /// Raw bytes of a successful response.
    pub fn data(&self) -> Option<&[u8]> {
        self.success().map(|response| response.body.as_slice())
    }
}

/// Observable lifecycle state of a fired call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallState {
    Firing,
    /// Answered from a stub descriptor; the transport is not used.
    Stubbed,
    /// Handed to the transport.
    Dispatched,
    Completed(Outcome),
    /// Aborted before completion. No outcome is delivered.
    Cancelled,
}

impl CallState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CallState::Completed(_) | CallState::Cancelled)
    }
}

/// Builder for `NetworkCall`.
pub struct NetworkCallBuilder {
    configuration: Arc<ServerConfiguration>,
    endpoint: String,
    method: HttpMethod,
    headers: Headers,
    body: Option<Vec<u8>>,
    decorators: Vec<Arc<dyn HeaderDecorator>>,
    stub: Option<StubDescriptor>,
    fixtures: Option<Arc<dyn FixtureLoader>>,
    stub_registry: Option<StubRegistry>,
    error_handler: Option<Arc<dyn ErrorHandler>>,
    transport: Option<Arc<dyn Transport>>,
}

impl NetworkCallBuilder {
    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Set one header; a later value for the same name wins.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers.extend(&headers);
        self
    }

    /// Raw request body. Never sent with GET.
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn json_body<T: serde::Serialize + ?Sized>(mut self, value: &T) -> Result<Self, Error> {
        self.body = Some(serde_json::to_vec(value)?);
        Ok(self)
    }

    pub fn decorate(mut self, decorator: impl HeaderDecorator + 'static) -> Self {
        self.decorators.push(Arc::new(decorator));
        self
    }

    pub fn stub(mut self, stub: StubDescriptor) -> Self {
        self.stub = Some(stub);
        self
    }

    /// Where fixture-backed stubs load their bodies from. Defaults to
    /// `DirFixtureLoader::from_env()`.
    pub fn fixtures(mut self, fixtures: Arc<dyn FixtureLoader>) -> Self {
        self.fixtures = Some(fixtures);
        self
    }

    /// Share a stub registry with other calls, e.g. to observe it in tests.
    pub fn stub_registry(mut self, registry: StubRegistry) -> Self {
        self.stub_registry = Some(registry);
        self
    }

    pub fn error_handler(mut self, handler: Arc<dyn ErrorHandler>) -> Self {
        self.error_handler = Some(handler);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Validate the URL and, for a call that will be stubbed, resolve the
    /// stub's body. A missing fixture fails here rather than at fire time.
    pub fn build(self) -> Result<NetworkCall, Error> {
        let url = self.configuration.url_for(&self.endpoint);
        url::Url::parse(&url).map_err(|e| Error::InvalidUrl {
            url: url.clone(),
            message: e.to_string(),
        })?;

        if let Some(stub) = &self.stub {
            if !(100..=599).contains(&stub.response_code) {
                return Err(Error::InvalidStub {
                    code: stub.response_code,
                });
            }
        }

        let stub_response = match (&self.stub, self.configuration.should_stub) {
            (Some(stub), true) => {
                let fixtures: Arc<dyn FixtureLoader> = match self.fixtures {
                    Some(fixtures) => fixtures,
                    None => Arc::new(DirFixtureLoader::from_env()),
                };
                Some(stub.to_response(&url, fixtures.as_ref())?)
            }
            _ => None,
        };

        let transport = match self.transport {
            Some(transport) => transport,
            None => default_transport()?,
        };

        Ok(NetworkCall {
            id: Uuid::new_v4(),
            configuration: self.configuration,
            endpoint: self.endpoint,
            url,
            method: self.method,
            headers: self.headers,
            body: self.body,
            decorators: self.decorators,
            stub: self.stub,
            stub_response,
            stub_registry: self.stub_registry.unwrap_or_default(),
            error_handler: self.error_handler,
            transport,
        })
    }
}

#[cfg(feature = "reqwest")]
fn default_transport() -> Result<Arc<dyn Transport>, Error> {
    Ok(Arc::new(crate::transport::ReqwestTransport::with_default_timeout()?))
}

#[cfg(not(feature = "reqwest"))]
fn default_transport() -> Result<Arc<dyn Transport>, Error> {
    Err(Error::MissingConfig("transport".to_string()))
}

/// A single configured HTTP call.
pub struct NetworkCall {
    id: Uuid,
    configuration: Arc<ServerConfiguration>,
    endpoint: String,
    url: String,
    method: HttpMethod,
    headers: Headers,
    body: Option<Vec<u8>>,
    decorators: Vec<Arc<dyn HeaderDecorator>>,
    stub: Option<StubDescriptor>,
    stub_response: Option<HttpResponse>,
    stub_registry: StubRegistry,
    error_handler: Option<Arc<dyn ErrorHandler>>,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for NetworkCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkCall")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("stub", &self.stub)
            .finish_non_exhaustive()
    }
}

impl NetworkCall {
    pub fn builder(configuration: Arc<ServerConfiguration>, endpoint: impl Into<String>) -> NetworkCallBuilder {
        NetworkCallBuilder {
            configuration,
            endpoint: endpoint.into(),
            method: HttpMethod::default(),
            headers: Headers::new(),
            body: None,
            decorators: Vec::new(),
            stub: None,
            fixtures: None,
            stub_registry: None,
            error_handler: None,
            transport: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn configuration(&self) -> &ServerConfiguration {
        &self.configuration
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn request_url(&self) -> &str {
        &self.url
    }

    pub fn stub(&self) -> Option<&StubDescriptor> {
        self.stub.as_ref()
    }

    /// Whether firing will answer from the stub instead of the transport.
    pub fn will_stub(&self) -> bool {
        self.stub_response.is_some()
    }

    /// Compose the request. Caller headers go first, then decorators run in
    /// the order they were added. GET requests never carry a body.
    pub fn build_request(&self) -> HttpRequest {
        let mut headers = self.headers.clone();
        for decorator in &self.decorators {
            decorator.decorate(&mut headers);
        }
        let body = if self.method.allows_body() {
            self.body.clone()
        } else {
            None
        };
        HttpRequest {
            method: self.method,
            url: self.url.clone(),
            headers,
            body,
        }
    }

    /// Start the call on the current tokio runtime.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub fn fire(self) -> CallHandle {
        let id = self.id;
        let (sender, receiver) = watch::channel(CallState::Firing);
        let sender = Arc::new(sender);
        let weak = Arc::downgrade(&sender);
        let span = tracing::info_span!(
            "network_call",
            call_id = %id,
            method = %self.method,
            url = %self.url
        );

        let task = tokio::spawn(
            async move {
                tracing::debug!("firing");
                let outcome = self.run(&sender).await;
                sender.send_if_modified(|state| {
                    if state.is_terminal() {
                        false
                    } else {
                        *state = CallState::Completed(outcome);
                        true
                    }
                });
            }
            .instrument(span),
        );

        CallHandle {
            id,
            sender: weak,
            receiver,
            abort: task.abort_handle(),
        }
    }

    async fn run(self, state: &watch::Sender<CallState>) -> Outcome {
        let request = self.build_request();

        let _interception = self
            .stub_response
            .clone()
            .map(|response| self.stub_registry.register(self.id, &request, response));

        let result = match self.stub_registry.intercept(self.id, &request) {
            Some(response) => {
                advance(state, CallState::Stubbed);
                tracing::debug!(status = response.status, "answering from stub");
                Ok(response)
            }
            None => {
                advance(state, CallState::Dispatched);
                self.transport.execute(request).await
            }
        };

        self.finish(result)
    }

    fn finish(&self, result: Result<HttpResponse, TransportError>) -> Outcome {
        let response = match result {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(error = %err, "request failed without a response");
                return Outcome::Failed(CallError::Transport(err));
            }
        };

        match classify(response) {
            Ok(response) => {
                tracing::debug!(status = response.status, "call succeeded");
                Outcome::Success(response)
            }
            Err(err) => {
                if let Some(handler) = &self.error_handler {
                    if handler.handle(&err) {
                        tracing::info!(code = err.code, "server error handled");
                        return Outcome::Handled(err);
                    }
                }
                tracing::warn!(code = err.code, "server error");
                Outcome::Failed(CallError::Server(err))
            }
        }
    }
}

fn advance(state: &watch::Sender<CallState>, next: CallState) {
    state.send_if_modified(|current| {
        if current.is_terminal() {
            false
        } else {
            *current = next;
            true
        }
    });
}

/// Handle to a fired call.
///
/// Dropping the handle does not cancel the call.
#[derive(Debug)]
pub struct CallHandle {
    id: Uuid,
    sender: Weak<watch::Sender<CallState>>,
    receiver: watch::Receiver<CallState>,
    abort: AbortHandle,
}

impl CallHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Latest published state.
    pub fn state(&self) -> CallState {
        self.receiver.borrow().clone()
    }

    /// Receiver that starts at the latest state.
    pub fn subscribe(&self) -> watch::Receiver<CallState> {
        self.receiver.clone()
    }

    /// Abort the call. Has no effect once the call has completed.
    pub fn cancel(&self) {
        let Some(sender) = self.sender.upgrade() else {
            return;
        };
        let cancelled = sender.send_if_modified(|state| {
            if state.is_terminal() {
                false
            } else {
                *state = CallState::Cancelled;
                true
            }
        });
        if cancelled {
            self.abort.abort();
            tracing::debug!(call_id = %self.id, "call cancelled");
        }
    }

    /// Wait for the terminal outcome. `None` when the call was cancelled.
    pub async fn outcome(&self) -> Option<Outcome> {
        let mut receiver = self.receiver.clone();
        let state = receiver.wait_for(CallState::is_terminal).await.ok()?.clone();
        match state {
            CallState::Completed(outcome) => Some(outcome),
            _ => None,
        }
    }
}
