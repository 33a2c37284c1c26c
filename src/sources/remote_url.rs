//! Remote-URL fetcher - an artifact at a plain HTTP(S) URL.
//!
//! The artifact carries its own metadata, so `find` downloads it into
//! scratch and inspects it like a local file; `fetch` returns that copy.

use std::sync::Arc;

use anyhow::{Context, Result};
use url::Url;

use crate::core::{FetchMethod, RepositorySpec, RequirementSpec, StowError};
use crate::sources::fetcher::{
    artifact_file_name, download_verified, ArtifactHint, ArtifactLocation, FetchResult, Fetcher,
    FindResult, Scratch,
};
use crate::sources::local_file::describe_artifact;
use crate::util::http::HttpClient;

/// Fetcher for [`FetchMethod::RemoteUrl`].
pub struct RemoteUrlFetcher {
    http: Arc<dyn HttpClient>,
    scratch: Scratch,
}

impl RemoteUrlFetcher {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        RemoteUrlFetcher {
            http,
            scratch: Scratch::new(),
        }
    }
}

impl Fetcher for RemoteUrlFetcher {
    fn fetch_method(&self) -> FetchMethod {
        FetchMethod::RemoteUrl
    }

    fn find(&mut self, requirement_spec: &RequirementSpec) -> Result<FindResult> {
        let source = requirement_spec.source().ok_or_else(|| StowError::InvalidSpec {
            spec: requirement_spec.to_string(),
            reason: "no artifact URL given".to_string(),
        })?;
        let url = Url::parse(source).with_context(|| format!("invalid artifact URL `{}`", source))?;

        // Name the scratch copy after the URL so role versions survive.
        let placeholder = RepositorySpec::new(
            requirement_spec.namespace(),
            requirement_spec.name(),
            semver::Version::new(0, 0, 0),
            FetchMethod::RemoteUrl,
        );
        let file_name = artifact_file_name(&placeholder, &ArtifactHint::url(url.clone()));
        let dest = self.scratch.path()?.join(file_name);

        download_verified(self.http.as_ref(), &url, &dest, None)?;

        let mut found = describe_artifact(requirement_spec, &dest, FetchMethod::RemoteUrl)?;
        found.artifact = ArtifactHint::path(dest);
        Ok(found)
    }

    fn fetch(&mut self, _repository_spec: &RepositorySpec, find_result: &FindResult) -> Result<FetchResult> {
        match &find_result.artifact.location {
            ArtifactLocation::Path(path) if path.exists() => Ok(FetchResult {
                artifact_path: path.clone(),
            }),
            other => anyhow::bail!("artifact from {} is no longer available; find again", other),
        }
    }

    fn cleanup(&mut self) {
        self.scratch.release();
    }
}
