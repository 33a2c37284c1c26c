//! Registry HTTP API client.
//!
//! # Protocol
//!
//! ```text
//! GET {server}/api/                                   -> {"current_version": "v2"}
//! GET {server}/api/v2/collections/{ns}/{name}/        -> detail + versions_url
//! GET {versions_url}                                  -> [{version, href}] or paginated
//! GET {href}                                          -> download_url, sha256, dependencies
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use serde::Deserialize;
use url::Url;

use crate::core::StowError;
use crate::util::http::{as_directory, get_json, resolve_url, HttpClient};

/// API versions this client speaks.
pub const SUPPORTED_API_VERSIONS: &[&str] = &["v2"];

/// Upper bound on followed `next` links, against servers that loop.
const MAX_PAGES: usize = 1000;

#[derive(Debug, Deserialize)]
struct ApiRoot {
    current_version: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamespaceRef {
    pub name: String,
}

/// `GET /api/v2/collections/{ns}/{name}/`
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionDetail {
    pub namespace: NamespaceRef,
    pub name: String,
    #[serde(default)]
    pub deprecated: bool,
    pub versions_url: String,
}

/// One entry of the version list.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionRef {
    pub version: String,
    pub href: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VersionsPage {
    Paginated {
        results: Vec<VersionRef>,
        #[serde(default)]
        next: Option<String>,
    },
    List(Vec<VersionRef>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactDetail {
    pub filename: String,
    pub sha256: String,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VersionMetadata {
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

/// `GET {href}`
#[derive(Debug, Clone, Deserialize)]
pub struct VersionDetail {
    pub version: String,
    pub download_url: String,
    pub artifact: ArtifactDetail,
    #[serde(default)]
    pub metadata: VersionMetadata,
}

/// Client for one registry server. API version negotiation happens at most
/// once per client.
pub struct RegistryClient {
    server: Url,
    http: Arc<dyn HttpClient>,
    api_version: Mutex<Option<String>>,
}

impl RegistryClient {
    pub fn new(server: &Url, http: Arc<dyn HttpClient>) -> Self {
        RegistryClient {
            server: as_directory(server),
            http,
            api_version: Mutex::new(None),
        }
    }

    pub fn server(&self) -> &Url {
        &self.server
    }

    pub fn http(&self) -> &dyn HttpClient {
        self.http.as_ref()
    }

    /// Negotiated API version.
    pub fn api_version(&self) -> Result<String> {
        let mut cached = self
            .api_version
            .lock()
            .map_err(|_| anyhow::anyhow!("registry client lock poisoned"))?;

        if let Some(version) = cached.as_ref() {
            return Ok(version.clone());
        }

        let url = resolve_url(&self.server, "api/")?;
        let root: ApiRoot = get_json(self.http(), &url)
            .with_context(|| format!("failed to query API version of {}", self.server))?;

        if !SUPPORTED_API_VERSIONS.contains(&root.current_version.as_str()) {
            return Err(StowError::Download {
                url: url.to_string(),
                reason: format!(
                    "unsupported registry API version `{}` (supported: {})",
                    root.current_version,
                    SUPPORTED_API_VERSIONS.join(", ")
                ),
            }
            .into());
        }

        tracing::debug!("registry {} speaks API {}", self.server, root.current_version);
        *cached = Some(root.current_version.clone());
        Ok(root.current_version)
    }

    /// Collection detail, or `None` if the server does not know it.
    pub fn collection(&self, namespace: &str, name: &str) -> Result<Option<CollectionDetail>> {
        let version = self.api_version()?;
        let url = resolve_url(
            &self.server,
            &format!("api/{}/collections/{}/{}/", version, namespace, name),
        )?;

        let response = self.http.get(&url)?;
        if response.status == 404 {
            return Ok(None);
        }
        if !response.is_success() {
            return Err(StowError::Download {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status),
            }
            .into());
        }

        let detail = serde_json::from_slice(&response.body)
            .with_context(|| format!("invalid collection detail from {}", url))?;
        Ok(Some(detail))
    }

    /// Every published version, following pagination.
    pub fn versions(&self, detail: &CollectionDetail) -> Result<Vec<VersionRef>> {
        let mut versions = Vec::new();
        let mut next = Some(resolve_url(&self.server, &detail.versions_url)?);
        let mut pages = 0;

        while let Some(url) = next.take() {
            pages += 1;
            if pages > MAX_PAGES {
                anyhow::bail!("version list at {} has more than {} pages", detail.versions_url, MAX_PAGES);
            }

            match get_json::<VersionsPage>(self.http(), &url)? {
                VersionsPage::List(list) => versions.extend(list),
                VersionsPage::Paginated { results, next: link } => {
                    versions.extend(results);
                    next = link
                        .filter(|l| !l.is_empty())
                        .map(|l| resolve_url(&self.server, &l))
                        .transpose()?;
                }
            }
        }

        Ok(versions)
    }

    pub fn version_detail(&self, version: &VersionRef) -> Result<VersionDetail> {
        let url = resolve_url(&self.server, &version.href)?;
        get_json(self.http(), &url)
    }

    /// Absolute URL for a download link from a version detail.
    pub fn download_url(&self, detail: &VersionDetail) -> Result<Url> {
        resolve_url(&self.server, &detail.download_url)
    }
}
