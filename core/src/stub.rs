//! Canned responses and the fixtures that back them.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::Error;
use crate::http::{Headers, HttpResponse};

/// Looks up fixture bodies by name.
pub trait FixtureLoader: Send + Sync {
    fn load_fixture(&self, name: &str) -> Result<Vec<u8>, Error>;
}

/// Loads fixtures from files in a directory.
#[derive(Debug, Clone)]
pub struct DirFixtureLoader {
    root: PathBuf,
}

impl DirFixtureLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory named by `NETCALL_FIXTURES`, or `fixtures/` when unset.
    pub fn from_env() -> Self {
        let root = std::env::var("NETCALL_FIXTURES").unwrap_or_else(|_| "fixtures".to_string());
        Self::new(root)
    }
}

impl FixtureLoader for DirFixtureLoader {
    fn load_fixture(&self, name: &str) -> Result<Vec<u8>, Error> {
        let path = self.root.join(name);
        std::fs::read(&path).map_err(|e| Error::Fixture {
            name: name.to_string(),
            message: format!("{}: {e}", path.display()),
        })
    }
}

/// Fixtures held in memory, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct MemoryFixtureLoader {
    fixtures: HashMap<String, Vec<u8>>,
}

impl MemoryFixtureLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fixture(mut self, name: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.fixtures.insert(name.into(), body.into());
        self
    }
}

impl FixtureLoader for MemoryFixtureLoader {
    fn load_fixture(&self, name: &str) -> Result<Vec<u8>, Error> {
        self.fixtures.get(name).cloned().ok_or_else(|| Error::Fixture {
            name: name.to_string(),
            message: "no such fixture".to_string(),
        })
    }
}

/// Description of a canned response.
///
/// When both a fixture name and literal bytes are set, the fixture wins.
/// With neither, the body is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubDescriptor {
    pub response_code: u16,
    pub fixture: Option<String>,
    pub data: Option<Vec<u8>>,
    pub response_headers: Headers,
}

impl Default for StubDescriptor {
    fn default() -> Self {
        Self {
            response_code: 200,
            fixture: None,
            data: None,
            response_headers: Headers::from([("Content-Type", "application/json")]),
        }
    }
}

impl StubDescriptor {
    pub fn new(response_code: u16) -> Self {
        Self {
            response_code,
            ..Self::default()
        }
    }

    /// Stub answering with the named fixture.
    pub fn fixture(response_code: u16, name: impl Into<String>) -> Self {
        Self::new(response_code).with_fixture(name)
    }

    /// Stub answering with literal bytes.
    pub fn data(response_code: u16, data: impl Into<Vec<u8>>) -> Self {
        Self::new(response_code).with_data(data)
    }

    pub fn with_fixture(mut self, name: impl Into<String>) -> Self {
        self.fixture = Some(name.into());
        self
    }

    pub fn with_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.response_headers = headers;
        self
    }

    pub fn resolve_body(&self, fixtures: &dyn FixtureLoader) -> Result<Vec<u8>, Error> {
        match (&self.fixture, &self.data) {
            (Some(name), _) => fixtures.load_fixture(name),
            (None, Some(data)) => Ok(data.clone()),
            (None, None) => Ok(Vec::new()),
        }
    }

    /// Build the response this stub stands for, as if `url` had served it.
    pub fn to_response(&self, url: &str, fixtures: &dyn FixtureLoader) -> Result<HttpResponse, Error> {
        Ok(HttpResponse {
            status: self.response_code,
            headers: self.response_headers.clone(),
            url: url.to_string(),
            body: self.resolve_body(fixtures)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loader() -> MemoryFixtureLoader {
        MemoryFixtureLoader::new().with_fixture("login_success.json", br#"{"id":"1"}"#.to_vec())
    }

    #[test]
    fn default_headers_are_json() {
        let stub = StubDescriptor::new(204);
        assert_eq!(stub.response_headers.get("content-type"), Some("application/json"));
    }

    #[test]
    fn fixture_takes_precedence_over_data() {
        let stub = StubDescriptor::data(200, b"literal".to_vec()).with_fixture("login_success.json");
        assert_eq!(stub.resolve_body(&loader()).unwrap(), br#"{"id":"1"}"#.to_vec());
    }

    #[test]
    fn literal_data_is_used_verbatim() {
        let stub = StubDescriptor::data(200, b"literal".to_vec());
        assert_eq!(stub.resolve_body(&loader()).unwrap(), b"literal".to_vec());
    }

    #[test]
    fn no_source_means_empty_body() {
        let response = StubDescriptor::new(404).to_response("http://x/", &loader()).unwrap();
        assert!(response.body.is_empty());
        assert_eq!(response.status, 404);
        assert_eq!(response.url, "http://x/");
    }

    #[test]
    fn missing_fixture_is_an_error() {
        let stub = StubDescriptor::fixture(200, "nope.json");
        let err = stub.resolve_body(&loader()).unwrap_err();
        assert!(matches!(err, Error::Fixture { ref name, .. } if name == "nope.json"));
    }

    #[test]
    fn dir_loader_reports_missing_file() {
        let loader = DirFixtureLoader::new("/definitely/not/here");
        assert!(matches!(loader.load_fixture("a.json"), Err(Error::Fixture { .. })));
    }
}
