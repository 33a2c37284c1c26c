//! Registry fetcher - collections published on a registry server.
//!
//! Discovery is two-phase: list the published versions, let the resolver
//! pick one, then load that version's detail for its download link,
//! checksum and declared dependencies.

pub mod api;

use std::sync::Arc;

use anyhow::Result;

use crate::core::{FetchMethod, RepositorySpec, RequirementSpec, StowError};
use crate::resolver::{normalize_version, select_version};
use crate::sources::fetcher::{
    artifact_file_name, download_verified, ArtifactHint, ArtifactLocation, FetchResult, Fetcher,
    FindResult, Scratch,
};

pub use api::RegistryClient;

/// Fetcher for [`FetchMethod::Registry`].
pub struct RegistryFetcher {
    client: Arc<RegistryClient>,
    scratch: Scratch,
}

impl RegistryFetcher {
    pub fn new(client: Arc<RegistryClient>) -> Self {
        RegistryFetcher {
            client,
            scratch: Scratch::new(),
        }
    }
}

impl Fetcher for RegistryFetcher {
    fn fetch_method(&self) -> FetchMethod {
        FetchMethod::Registry
    }

    fn find(&mut self, requirement_spec: &RequirementSpec) -> Result<FindResult> {
        let label = requirement_spec.label();

        let detail = self
            .client
            .collection(requirement_spec.namespace(), requirement_spec.name())?
            .ok_or_else(|| StowError::NotFound {
                label: label.clone(),
                location: self.client.server().to_string(),
            })?;

        let versions = self.client.versions(&detail)?;
        let chosen = select_version(
            &label,
            requirement_spec.version_constraint(),
            versions.iter().map(|v| v.version.as_str()),
        )?;

        let version_ref = versions
            .iter()
            .find(|v| v.version == chosen)
            .ok_or_else(|| StowError::Ambiguous {
                label: label.clone(),
                reason: format!("selected version {} has no version entry", chosen),
            })?;

        let version_detail = self.client.version_detail(version_ref)?;
        let version = normalize_version(&chosen)?;

        let repository_spec = RepositorySpec::new(
            detail.namespace.name.as_str(),
            detail.name.as_str(),
            version,
            FetchMethod::Registry,
        );
        if repository_spec.label() != label {
            tracing::info!("{} is published as {}", label, repository_spec.label());
        }

        let artifact = ArtifactHint::url(self.client.download_url(&version_detail)?)
            .with_sha256(Some(version_detail.artifact.sha256.clone()))
            .with_size(version_detail.artifact.size)
            .with_filename(version_detail.artifact.filename.clone());

        Ok(FindResult {
            repository_spec,
            artifact,
            dependencies: version_detail.metadata.dependencies,
            deprecated: detail.deprecated,
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

        let file_name = artifact_file_name(repository_spec, &find_result.artifact);
        let dest = self.scratch.path()?.join(file_name);

        let artifact_path = download_verified(
            self.client.http(),
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
