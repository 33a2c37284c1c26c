//! Test utilities and mocks for stowage unit tests.
//!
//! This module provides mock implementations for the interfaces that talk to
//! the outside world: the HTTP client and the display callback.
//!
//! # Example
//!
//! ```rust,ignore
//! use stowage::test_support::{MockHttpClient, MockHttpResponse};
//!
//! #[test]
//! fn test_example() {
//!     let http = MockHttpClient::new();
//!     http.mock_url("https://galaxy.example.com/api/", MockHttpResponse::json(r#"{"current_version":"v2"}"#));
//!
//!     // Hand `http` to a RegistryClient...
//! }
//! ```

pub mod fixtures;

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{bail, Result};
use url::Url;

use crate::util::http::{HttpClient, HttpResponse};
use crate::util::shell::{Reporter, Status};

// Re-export fixtures for convenience
pub use fixtures::*;

/// Mock HTTP response.
#[derive(Debug, Clone)]
pub struct MockHttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl MockHttpResponse {
    /// Create a successful response with the given body.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        MockHttpResponse {
            status: 200,
            body: body.into(),
        }
    }

    /// Create a successful JSON response.
    pub fn json(body: &str) -> Self {
        MockHttpResponse::ok(body.as_bytes().to_vec())
    }

    /// Create a not found response.
    pub fn not_found() -> Self {
        MockHttpResponse {
            status: 404,
            body: b"Not Found".to_vec(),
        }
    }

    /// Create a server error response.
    pub fn server_error(message: &str) -> Self {
        MockHttpResponse {
            status: 500,
            body: message.as_bytes().to_vec(),
        }
    }
}

/// Mock HTTP client with canned responses and a request log.
#[derive(Debug, Default)]
pub struct MockHttpClient {
    responses: Mutex<HashMap<String, MockHttpResponse>>,
    requests: Mutex<Vec<String>>,
}

impl MockHttpClient {
    /// Create a new mock HTTP client.
    pub fn new() -> Self {
        MockHttpClient::default()
    }

    /// Add a response for an exact URL.
    pub fn mock_url(&self, url: &str, response: MockHttpResponse) -> &Self {
        self.responses
            .lock()
            .expect("mock lock")
            .insert(url.to_string(), response);
        self
    }

    /// Get all recorded requests.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("mock lock").clone()
    }

    /// Number of requests made for a URL.
    pub fn request_count(&self, url: &str) -> usize {
        self.requests().iter().filter(|r| r.as_str() == url).count()
    }

    /// Clear recorded requests.
    pub fn clear_requests(&self) {
        self.requests.lock().expect("mock lock").clear();
    }
}

impl HttpClient for MockHttpClient {
    fn get(&self, url: &Url) -> Result<HttpResponse> {
        self.requests
            .lock()
            .expect("mock lock")
            .push(url.to_string());

        match self.responses.lock().expect("mock lock").get(url.as_str()) {
            Some(response) => Ok(HttpResponse {
                status: response.status,
                body: response.body.clone(),
            }),
            None => bail!("no mock response for URL: {}", url),
        }
    }
}

/// Serves [`CollectionFixture`]s through a [`MockHttpClient`] the way a v2
/// registry would.
pub struct MockRegistry<'a> {
    http: &'a MockHttpClient,
    server: String,
}

impl<'a> MockRegistry<'a> {
    /// Registry at `server` (no trailing slash), with API negotiation mocked.
    pub fn new(http: &'a MockHttpClient, server: &str) -> Self {
        let server = server.trim_end_matches('/').to_string();
        http.mock_url(
            &format!("{}/api/", server),
            MockHttpResponse::json(r#"{"current_version": "v2"}"#),
        );
        MockRegistry { http, server }
    }

    /// Publish every version of one collection. All fixtures must share a label.
    pub fn publish(&self, versions: &[CollectionFixture], deprecated: bool) -> &Self {
        let Some(first) = versions.first() else {
            return self;
        };
        let base = format!(
            "{}/api/v2/collections/{}/{}/",
            self.server, first.namespace, first.name
        );

        self.http.mock_url(
            &base,
            MockHttpResponse::json(&format!(
                r#"{{"namespace": {{"name": "{}"}}, "name": "{}", "deprecated": {}, "versions_url": "{}versions/"}}"#,
                first.namespace, first.name, deprecated, base
            )),
        );

        let refs: Vec<String> = versions
            .iter()
            .map(|f| format!(r#"{{"version": "{v}", "href": "{base}versions/{v}/"}}"#, v = f.version))
            .collect();
        self.http.mock_url(
            &format!("{}versions/", base),
            MockHttpResponse::json(&format!("[{}]", refs.join(","))),
        );

        for fixture in versions {
            let download = format!("{}/download/{}", self.server, fixture.artifact_filename());
            let deps: Vec<String> = fixture
                .dependencies
                .iter()
                .map(|(label, constraint)| format!(r#""{}": "{}""#, label, constraint))
                .collect();

            self.http.mock_url(
                &format!("{}versions/{}/", base, fixture.version),
                MockHttpResponse::json(&format!(
                    r#"{{"version": "{}", "download_url": "{}",
                        "artifact": {{"filename": "{}", "sha256": "{}"}},
                        "metadata": {{"dependencies": {{{}}}}}}}"#,
                    fixture.version,
                    download,
                    fixture.artifact_filename(),
                    fixture.sha256(),
                    deps.join(",")
                )),
            );
            self.http
                .mock_url(&download, MockHttpResponse::ok(fixture.to_bytes()));
        }

        self
    }

    /// URL the artifact of `fixture` is downloaded from.
    pub fn download_url(&self, fixture: &CollectionFixture) -> String {
        format!("{}/download/{}", self.server, fixture.artifact_filename())
    }

    /// Answer 404 for a collection.
    pub fn missing(&self, namespace: &str, name: &str) -> &Self {
        self.http.mock_url(
            &format!("{}/api/v2/collections/{}/{}/", self.server, namespace, name),
            MockHttpResponse::not_found(),
        );
        self
    }
}

/// Display callback that records every message.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    messages: Mutex<Vec<(Status, String)>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        RecordingReporter::default()
    }

    /// All recorded messages in order.
    pub fn messages(&self) -> Vec<(Status, String)> {
        self.messages.lock().expect("reporter lock").clone()
    }

    /// Messages with a given status.
    pub fn with_status(&self, status: Status) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|(s, _)| *s == status)
            .map(|(_, m)| m)
            .collect()
    }

    /// Whether any message with `status` contains `needle`.
    pub fn contains(&self, status: Status, needle: &str) -> bool {
        self.with_status(status).iter().any(|m| m.contains(needle))
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, status: Status, message: &str) {
        self.messages
            .lock()
            .expect("reporter lock")
            .push((status, message.to_string()));
    }
}

/// Assertion helpers for common test patterns.
pub mod assertions {
    /// Assert that an error message chain contains a substring.
    pub fn assert_error_contains<T: std::fmt::Debug>(
        result: anyhow::Result<T>,
        substring: &str,
    ) {
        match result {
            Ok(v) => panic!("expected Err containing '{}', got Ok: {:?}", substring, v),
            Err(e) => {
                let msg = format!("{:#}", e);
                assert!(
                    msg.contains(substring),
                    "error '{}' does not contain '{}'",
                    msg,
                    substring
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_http_records_requests() {
        let client = MockHttpClient::new();
        client.mock_url("https://example.com/a", MockHttpResponse::ok(b"a".to_vec()));

        let url = Url::parse("https://example.com/a").unwrap();
        assert_eq!(client.get(&url).unwrap().body, b"a");
        assert_eq!(client.request_count("https://example.com/a"), 1);

        let other = Url::parse("https://example.com/b").unwrap();
        assert!(client.get(&other).is_err());
        assert_eq!(client.requests().len(), 2);
    }

    #[test]
    fn test_mock_registry_serves_artifacts() {
        let http = MockHttpClient::new();
        let fixture = CollectionFixture::new("acme", "widgets", "1.0.0").dependency("acme.base", "*");
        let registry = MockRegistry::new(&http, "https://hub.example.com/");
        registry.publish(std::slice::from_ref(&fixture), false);

        let url = Url::parse(&registry.download_url(&fixture)).unwrap();
        assert_eq!(http.get(&url).unwrap().body, fixture.to_bytes());

        let detail = Url::parse("https://hub.example.com/api/v2/collections/acme/widgets/versions/1.0.0/").unwrap();
        let body: serde_json::Value = serde_json::from_slice(&http.get(&detail).unwrap().body).unwrap();
        assert_eq!(body["metadata"]["dependencies"]["acme.base"], "*");
    }

    #[test]
    fn test_recording_reporter() {
        let reporter = RecordingReporter::new();
        reporter.report(Status::Skipped, "acme.widgets is already installed");
        reporter.report(Status::Installed, "acme.base 2.0.0");

        assert!(reporter.contains(Status::Skipped, "already installed"));
        assert_eq!(reporter.with_status(Status::Installed), vec!["acme.base 2.0.0"]);
        assert!(!reporter.contains(Status::Error, "anything"));
    }
}
