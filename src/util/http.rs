//! HTTP transport for registry calls, shelf indexes and artifact downloads.
//!
//! Everything above this module talks to an [`HttpClient`]; the blocking
//! reqwest client is the production implementation and also serves
//! `file://` URLs so shelves can live on local disk.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use url::Url;

use crate::core::StowError;

/// A fully-read HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Minimal GET-only client.
pub trait HttpClient: Send + Sync {
    /// Perform a GET. Transport failures are errors; HTTP error statuses are
    /// returned as responses.
    fn get(&self, url: &Url) -> Result<HttpResponse>;
}

/// Production client backed by `reqwest::blocking`.
pub struct BlockingHttpClient {
    client: reqwest::blocking::Client,
}

impl BlockingHttpClient {
    /// Build a client. `ignore_certs` disables TLS certificate validation.
    pub fn new(ignore_certs: bool) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("stowage/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(ignore_certs)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;

        if ignore_certs {
            tracing::warn!("TLS certificate validation is disabled");
        }

        Ok(BlockingHttpClient { client })
    }
}

impl HttpClient for BlockingHttpClient {
    fn get(&self, url: &Url) -> Result<HttpResponse> {
        if url.scheme() == "file" {
            return read_file_url(url);
        }

        tracing::debug!("GET {}", url);
        let response = self.client.get(url.clone()).send().map_err(|e| StowError::Download {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status().as_u16();
        let body = response.bytes().map_err(|e| StowError::Download {
            url: url.to_string(),
            reason: format!("failed to read response body: {}", e),
        })?;

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

/// Serve a `file://` URL as if it were an HTTP resource.
pub fn read_file_url(url: &Url) -> Result<HttpResponse> {
    let path = url.to_file_path().map_err(|_| StowError::Download {
        url: url.to_string(),
        reason: "not a local file path".to_string(),
    })?;

    if !path.is_file() {
        return Ok(HttpResponse {
            status: 404,
            body: Vec::new(),
        });
    }

    let body = std::fs::read(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(HttpResponse { status: 200, body })
}

/// GET a URL and return the body, failing on non-success statuses.
pub fn get_bytes(client: &dyn HttpClient, url: &Url) -> Result<Vec<u8>> {
    let response = client.get(url)?;
    if !response.is_success() {
        return Err(StowError::Download {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status),
        }
        .into());
    }
    Ok(response.body)
}

/// GET a URL and decode the JSON body.
pub fn get_json<T: DeserializeOwned>(client: &dyn HttpClient, url: &Url) -> Result<T> {
    let body = get_bytes(client, url)?;
    serde_json::from_slice(&body).with_context(|| format!("invalid JSON from {}", url))
}

/// Download a URL into `dest`. Returns the number of bytes written.
pub fn download_to(client: &dyn HttpClient, url: &Url, dest: &Path) -> Result<u64> {
    tracing::info!("Downloading {}", url);
    let body = get_bytes(client, url)?;

    if let Some(parent) = dest.parent() {
        crate::util::fs::ensure_dir(parent)?;
    }
    std::fs::write(dest, &body)
        .with_context(|| format!("failed to write download to {}", dest.display()))?;

    Ok(body.len() as u64)
}

/// Join a possibly relative URL from a server response against a base.
pub fn resolve_url(base: &Url, reference: &str) -> Result<Url> {
    base.join(reference)
        .with_context(|| format!("invalid URL `{}` relative to {}", reference, base))
}

/// A copy of `url` whose path ends in `/`, so that joins append rather
/// than replace the last segment.
pub fn as_directory(url: &Url) -> Url {
    let mut dir = url.clone();
    if !dir.path().ends_with('/') {
        let path = format!("{}/", dir.path());
        dir.set_path(&path);
    }
    dir
}
