//! Server configuration: where calls go and whether they are stubbed.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Immutable description of a target server.
///
/// Shared read-only by every call made against it, usually behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfiguration {
    pub scheme: String,
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_route: Option<String>,
    /// Calls carrying a stub descriptor are answered by the stub instead of
    /// the transport when this is set.
    #[serde(default)]
    pub should_stub: bool,
}

impl ServerConfiguration {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
            api_base_route: None,
            should_stub: false,
        }
    }

    pub fn with_api_base_route(mut self, route: impl Into<String>) -> Self {
        self.api_base_route = Some(route.into());
        self
    }

    pub fn with_stubbing(mut self, should_stub: bool) -> Self {
        self.should_stub = should_stub;
        self
    }

    /// Read a configuration from `NETCALL_SCHEME`, `NETCALL_HOST`,
    /// `NETCALL_API_ROUTE` and `NETCALL_STUB`.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let host = lookup("NETCALL_HOST")
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::MissingConfig("NETCALL_HOST".to_string()))?;
        let scheme = lookup("NETCALL_SCHEME").unwrap_or_else(|| "https".to_string());
        let api_base_route = lookup("NETCALL_API_ROUTE").filter(|r| !r.is_empty());
        let should_stub = lookup("NETCALL_STUB")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        Ok(Self {
            scheme,
            host,
            api_base_route,
            should_stub,
        })
    }

    /// `scheme://host/` with the API route appended as its own segment,
    /// e.g. `https://host/api/v1/`. Always ends in exactly one slash.
    pub fn base_url_string(&self) -> String {
        let host = self.host.trim_end_matches('/');
        let mut base = format!("{}://{}/", self.scheme, host);
        if let Some(route) = self.api_base_route.as_deref() {
            let route = route.trim_matches('/');
            if !route.is_empty() {
                base.push_str(route);
                base.push('/');
            }
        }
        base
    }

    /// Full URL for an endpoint relative to the base URL.
    pub fn url_for(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url_string(), endpoint.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn base_url_with_api_route() {
        let config = ServerConfiguration::new("https", "habitica.com").with_api_base_route("api/v1");
        assert_eq!(config.base_url_string(), "https://habitica.com/api/v1/");
        assert_eq!(config.url_for("tasks"), "https://habitica.com/api/v1/tasks");
    }

    #[test]
    fn base_url_without_api_route() {
        let config = ServerConfiguration::new("http", "localhost:3000");
        assert_eq!(config.base_url_string(), "http://localhost:3000/");
        assert_eq!(config.url_for("tasks"), "http://localhost:3000/tasks");
    }

    #[test]
    fn stray_slashes_are_collapsed() {
        let config = ServerConfiguration::new("https", "habitica.com/").with_api_base_route("/api/");
        assert_eq!(config.url_for("/tasks"), "https://habitica.com/api/tasks");
    }

    #[test]
    fn empty_api_route_behaves_like_none() {
        let config = ServerConfiguration::new("https", "habitica.com").with_api_base_route("");
        assert_eq!(config.url_for("tasks"), "https://habitica.com/tasks");
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: ServerConfiguration =
            serde_json::from_str(r#"{"scheme":"https","host":"staging.habitica.com"}"#).unwrap();
        assert_eq!(config.api_base_route, None);
        assert!(!config.should_stub);
    }

    #[test]
    fn from_lookup_reads_all_keys() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("NETCALL_HOST", "localhost"),
            ("NETCALL_SCHEME", "http"),
            ("NETCALL_API_ROUTE", "api/v1"),
            ("NETCALL_STUB", "true"),
        ]);
        let config = ServerConfiguration::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.url_for("tasks"), "http://localhost/api/v1/tasks");
        assert!(config.should_stub);
    }

    #[test]
    fn from_lookup_requires_host() {
        let err = ServerConfiguration::from_lookup(|_| None).unwrap_err();
        assert!(matches!(err, Error::MissingConfig(ref key) if key == "NETCALL_HOST"));
    }
}
