//! Shelf fetcher - a static, pre-built mirror.
//!
//! A shelf needs no API server: a root index names sub-indexes, and the
//! collections sub-index lists every artifact with its version, path and
//! optional checksum.

pub mod index;

use std::sync::Arc;

use anyhow::Result;
use url::Url;

use crate::core::{FetchMethod, RepositorySpec, RequirementSpec, StowError};
use crate::resolver::{normalize_version, select_version};
use crate::sources::fetcher::{
    artifact_file_name, download_verified, ArtifactHint, ArtifactLocation, FetchResult, Fetcher,
    FindResult, Scratch,
};
use crate::util::http::HttpClient;

pub use index::{ShelfEntry, ShelfIndex};

/// Fetcher for [`FetchMethod::Shelf`].
pub struct ShelfFetcher {
    name: String,
    uri: Url,
    http: Arc<dyn HttpClient>,
    scratch: Scratch,
}

impl ShelfFetcher {
    pub fn new(name: impl Into<String>, uri: Url, http: Arc<dyn HttpClient>) -> Self {
        ShelfFetcher {
            name: name.into(),
            uri,
            http,
            scratch: Scratch::new(),
        }
    }
}

impl Fetcher for ShelfFetcher {
    fn fetch_method(&self) -> FetchMethod {
        FetchMethod::Shelf
    }

    fn find(&mut self, requirement_spec: &RequirementSpec) -> Result<FindResult> {
        let label = requirement_spec.label();
        let index = ShelfIndex::load(self.http.as_ref(), &self.uri)?;

        let entries: Vec<&ShelfEntry> = index
            .entries_for(requirement_spec.namespace(), requirement_spec.name())
            .collect();
        if entries.is_empty() {
            return Err(StowError::NotFound {
                label,
                location: format!("shelf `{}` ({})", self.name, self.uri),
            }
            .into());
        }

        let chosen = select_version(
            &label,
            requirement_spec.version_constraint(),
            entries.iter().map(|e| e.version.as_str()),
        )?;

        let matching: Vec<&&ShelfEntry> = entries.iter().filter(|e| e.version == chosen).collect();
        let entry = match matching.as_slice() {
            [entry] => **entry,
            _ => {
                return Err(StowError::Ambiguous {
                    label,
                    reason: format!(
                        "shelf `{}` lists version {} {} times",
                        self.name,
                        chosen,
                        matching.len()
                    ),
                }
                .into())
            }
        };

        let repository_spec = RepositorySpec::new(
            entry.namespace.as_str(),
            entry.name.as_str(),
            normalize_version(&entry.version)?,
            FetchMethod::Shelf,
        );

        Ok(FindResult {
            repository_spec,
            artifact: ArtifactHint::url(index.artifact_url(entry)?).with_sha256(entry.sha256.clone()),
            dependencies: entry.dependencies.clone(),
            deprecated: false,
        })
    }

    fn fetch(&mut self, repository_spec: &RepositorySpec, find_result: &FindResult) -> Result<FetchResult> {
        let url = match &find_result.artifact.location {
            ArtifactLocation::Url(url) => url.clone(),
            ArtifactLocation::Path(path) => {
                return Ok(FetchResult {
                    artifact_path: path.clone(),
                })
            }
        };

        let dest = self
            .scratch
            .path()?
            .join(artifact_file_name(repository_spec, &find_result.artifact));

        let artifact_path = download_verified(
            self.http.as_ref(),
            &url,
            &dest,
            find_result.artifact.sha256.as_deref(),
        )?;
        Ok(FetchResult { artifact_path })
    }

    fn cleanup(&mut self) {
        self.scratch.release();
    }
}
