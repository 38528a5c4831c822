//! The transport seam: whatever actually performs an HTTP round-trip.
//!
//! # Design
//! Calls never talk to the network themselves. They hand an `HttpRequest`
//! to a `Transport` and classify whatever comes back. Timeouts and other
//! connection policy belong to the transport's own configuration.
//!
//! `ReqwestTransport` (feature `reqwest`, on by default) is fully async:
//! dropping its future, as happens when a call is cancelled, closes the
//! connection. Redirects are never followed, so a 3xx reaches the caller
//! as a response and is classified like any other status.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};

/// Performs a request and returns the raw response.
///
/// Any status code counts as a response; only a failure to obtain one is
/// an error.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[cfg(feature = "reqwest")]
pub use self::reqwest_transport::{ReqwestTransport, TransportConfig};

#[cfg(feature = "reqwest")]
mod reqwest_transport {
    use std::time::Duration;

    use async_trait::async_trait;
    use reqwest::redirect::Policy;
    use reqwest::{Client, Method};

    use super::Transport;
    use crate::error::TransportError;
    use crate::http::{HttpMethod, HttpRequest, HttpResponse};

    /// Connection policy for `ReqwestTransport`.
    #[derive(Debug, Clone)]
    pub struct TransportConfig {
        /// Upper bound for a whole request, connect to last body byte.
        pub timeout: Option<Duration>,
    }

    impl Default for TransportConfig {
        fn default() -> Self {
            Self {
                timeout: Some(Duration::from_secs(30)),
            }
        }
    }

    /// Transport backed by a shared reqwest `Client`.
    #[derive(Debug, Clone)]
    pub struct ReqwestTransport {
        client: Client,
    }

    impl ReqwestTransport {
        pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
            let mut builder = Client::builder().redirect(Policy::none());
            if let Some(timeout) = config.timeout {
                builder = builder.timeout(timeout);
            }
            let client = builder.build().map_err(|e| TransportError::new(e.to_string()))?;
            Ok(Self { client })
        }

        pub fn with_default_timeout() -> Result<Self, TransportError> {
            Self::new(TransportConfig::default())
        }
    }

    fn method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }

    #[async_trait]
    impl Transport for ReqwestTransport {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            let mut builder = self.client.request(method(request.method), request.url.as_str());
            for (name, value) in request.headers.iter() {
                builder = builder.header(name, value);
            }
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let response = builder
                .send()
                .await
                .map_err(|e| TransportError::new(e.to_string()))?;

            let status = response.status().as_u16();
            let url = response.url().to_string();
            let headers = response
                .headers()
                .iter()
                .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
                .collect();
            let body = response
                .bytes()
                .await
                .map_err(|e| TransportError::new(e.to_string()))?
                .to_vec();

            Ok(HttpResponse {
                status,
                headers,
                url,
                body,
            })
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn every_method_maps_to_its_wire_name() {
            for m in [
                HttpMethod::Get,
                HttpMethod::Post,
                HttpMethod::Put,
                HttpMethod::Patch,
                HttpMethod::Delete,
            ] {
                assert_eq!(method(m).as_str(), m.as_str());
            }
        }

        #[test]
        fn builds_without_a_timeout() {
            assert!(ReqwestTransport::new(TransportConfig { timeout: None }).is_ok());
        }
    }
}
