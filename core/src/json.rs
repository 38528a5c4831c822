//! JSON calls: fixed JSON headers plus decoding of successful bodies.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::call::{CallHandle, HeaderDecorator, NetworkCall, NetworkCallBuilder, Outcome};
use crate::error::{CallError, Error};
use crate::http::{Headers, HttpRequest};

pub const CONTENT_TYPE: &str = "Content-Type";
pub const ACCEPT: &str = "Accept";
pub const APPLICATION_JSON: &str = "application/json";

/// `Content-Type` and `Accept` set to `application/json`.
pub fn json_headers() -> Headers {
    Headers::from([(CONTENT_TYPE, APPLICATION_JSON), (ACCEPT, APPLICATION_JSON)])
}

/// Adds the JSON headers the caller did not set. Caller values win.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonHeaders;

impl HeaderDecorator for JsonHeaders {
    fn decorate(&self, headers: &mut Headers) {
        for (name, value) in json_headers().iter() {
            headers.insert_if_absent(name, value);
        }
    }
}

/// Payloads may arrive bare or wrapped as `{"data": ...}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

/// Decode a response body. An empty body decodes as JSON `null`.
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, CallError> {
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        &b"null"[..]
    } else {
        body
    };
    serde_json::from_slice(body).map_err(|e| CallError::Parse(e.to_string()))
}

/// Decode a body that may be wrapped in a `data` envelope.
pub fn decode_payload<T: DeserializeOwned>(body: &[u8]) -> Result<T, CallError> {
    match decode::<Envelope<T>>(body)? {
        Envelope::Wrapped { data } => Ok(data),
        Envelope::Bare(value) => Ok(value),
    }
}

/// A `NetworkCall` that speaks JSON.
#[derive(Debug)]
pub struct JsonCall {
    call: NetworkCall,
}

impl JsonCall {
    /// Build `builder` with the JSON headers applied.
    pub fn new(builder: NetworkCallBuilder) -> Result<Self, Error> {
        Ok(Self {
            call: builder.decorate(JsonHeaders).build()?,
        })
    }

    pub fn call(&self) -> &NetworkCall {
        &self.call
    }

    pub fn build_request(&self) -> HttpRequest {
        self.call.build_request()
    }

    pub fn fire(self) -> JsonHandle {
        JsonHandle {
            inner: self.call.fire(),
        }
    }
}

/// Handle to a fired `JsonCall`.
#[derive(Debug)]
pub struct JsonHandle {
    inner: CallHandle,
}

impl JsonHandle {
    /// The underlying handle, for raw bytes and state.
    pub fn raw(&self) -> &CallHandle {
        &self.inner
    }

    pub fn cancel(&self) {
        self.inner.cancel();
    }

    /// Outcome with the success body parsed as a JSON value.
    pub async fn json(&self) -> Option<Outcome<serde_json::Value>> {
        let outcome = self.inner.outcome().await?;
        Some(outcome.and_then(|response| decode(&response.body)))
    }

    /// Outcome with the success body decoded into `T`, unwrapping a
    /// `data` envelope when present.
    pub async fn decode<T: DeserializeOwned>(&self) -> Option<Outcome<T>> {
        let outcome = self.inner.outcome().await?;
        Some(outcome.and_then(|response| decode_payload(&response.body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Task {
        text: String,
    }

    #[test]
    fn decorator_fills_missing_json_headers() {
        let mut headers = Headers::from([("Custom", "header")]);
        JsonHeaders.decorate(&mut headers);
        assert_eq!(
            headers,
            Headers::from([
                ("Custom", "header"),
                ("Content-Type", "application/json"),
                ("Accept", "application/json"),
            ])
        );
    }

    #[test]
    fn caller_headers_win_over_json_defaults() {
        let mut headers = Headers::from([("accept", "text/plain")]);
        JsonHeaders.decorate(&mut headers);
        assert_eq!(headers.get("Accept"), Some("text/plain"));
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn decode_reports_parse_errors() {
        let err = decode::<serde_json::Value>(b"not json").unwrap_err();
        assert!(matches!(err, CallError::Parse(_)));
    }

    #[test]
    fn empty_body_decodes_as_null() {
        assert_eq!(decode::<serde_json::Value>(b"").unwrap(), json!(null));
        assert_eq!(decode::<Option<Task>>(b" \n").unwrap(), None);
    }

    #[test]
    fn payload_accepts_bare_and_wrapped() {
        let bare: Task = decode_payload(br#"{"text":"walk"}"#).unwrap();
        let wrapped: Task = decode_payload(br#"{"success":true,"data":{"text":"walk"}}"#).unwrap();
        assert_eq!(bare, wrapped);
    }

    #[test]
    fn payload_of_wrong_shape_is_a_parse_error() {
        let err = decode_payload::<Task>(br#"{"data":{"nope":1}}"#).unwrap_err();
        assert!(matches!(err, CallError::Parse(_)));
    }
}
