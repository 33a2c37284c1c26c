//! Local-file fetcher - an artifact already on disk.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::archive::ArchiveInfo;
use crate::core::spec_parse::parse_artifact_filename;
use crate::core::{FetchMethod, RepositorySpec, RequirementSpec, StowError};
use crate::resolver::{normalize_version, ResolveError};
use crate::sources::fetcher::{ArtifactHint, ArtifactLocation, FetchResult, Fetcher, FindResult};

/// Fetcher for [`FetchMethod::LocalFile`]. `fetch` hands back the file in place.
#[derive(Debug, Default)]
pub struct LocalFileFetcher;

impl LocalFileFetcher {
    pub fn new() -> Self {
        LocalFileFetcher
    }
}

impl Fetcher for LocalFileFetcher {
    fn fetch_method(&self) -> FetchMethod {
        FetchMethod::LocalFile
    }

    fn find(&mut self, requirement_spec: &RequirementSpec) -> Result<FindResult> {
        let path = requirement_spec
            .source()
            .map(PathBuf::from)
            .filter(|p| p.is_file())
            .ok_or_else(|| StowError::NotFound {
                label: requirement_spec.label(),
                location: requirement_spec
                    .source()
                    .unwrap_or("the local filesystem")
                    .to_string(),
            })?;

        describe_artifact(requirement_spec, &path, FetchMethod::LocalFile)
    }

    fn fetch(&mut self, _repository_spec: &RepositorySpec, find_result: &FindResult) -> Result<FetchResult> {
        match &find_result.artifact.location {
            ArtifactLocation::Path(path) => Ok(FetchResult {
                artifact_path: path.clone(),
            }),
            ArtifactLocation::Url(url) => anyhow::bail!("local artifact has a remote location: {}", url),
        }
    }

    fn cleanup(&mut self) {}
}

/// Build a [`FindResult`] for an artifact file on disk.
///
/// The version comes from the artifact's manifest or, for manifest-less
/// roles, from its conventional file name. The identity is the requirement's.
pub(crate) fn describe_artifact(
    requirement_spec: &RequirementSpec,
    path: &Path,
    fetch_method: FetchMethod,
) -> Result<FindResult> {
    let label = requirement_spec.label();
    let info = ArchiveInfo::inspect(path)?;

    let version = match &info.manifest {
        Some(manifest) => manifest.version()?,
        None => {
            let file_name = path
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_default();
            let (_, _, raw) = parse_artifact_filename(&file_name).ok_or_else(|| StowError::Ambiguous {
                label: label.clone(),
                reason: format!(
                    "{} has no collection.toml and its file name carries no version",
                    path.display()
                ),
            })?;
            normalize_version(&raw)?
        }
    };

    let constraint = requirement_spec.version_constraint();
    if !constraint.matches(&version) {
        return Err(ResolveError::NoMatchingVersion {
            label,
            constraint: constraint.to_string(),
            available: vec![version.to_string()],
        }
        .into());
    }

    let repository_spec = RepositorySpec::new(
        requirement_spec.namespace(),
        requirement_spec.name(),
        version,
        fetch_method,
    );

    Ok(FindResult {
        repository_spec,
        artifact: ArtifactHint::path(path),
        dependencies: info.dependencies(),
        deprecated: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parse_requirement_spec;
    use crate::test_support::CollectionFixture;
    use semver::Version;
    use tempfile::TempDir;

    #[test]
    fn test_find_reads_manifest() {
        let tmp = TempDir::new().unwrap();
        let path = CollectionFixture::new("acme", "widgets", "1.3.0")
            .dependency("acme.base", ">=2.0.0")
            .write_to(tmp.path());
        let spec = parse_requirement_spec(path.to_str().unwrap(), None).unwrap();

        let mut fetcher = LocalFileFetcher::new();
        let found = fetcher.find(&spec).unwrap();
        assert_eq!(found.repository_spec.label(), "acme.widgets");
        assert_eq!(found.repository_spec.version(), &Version::new(1, 3, 0));
        assert_eq!(found.dependencies["acme.base"], ">=2.0.0");

        let fetched = fetcher.fetch(&found.repository_spec, &found).unwrap();
        assert_eq!(fetched.artifact_path, path);

        fetcher.cleanup();
        assert!(path.exists());
    }

    #[test]
    fn test_find_role_uses_file_name_version() {
        let tmp = TempDir::new().unwrap();
        let path = CollectionFixture::role("acme", "server", "0.4.0").write_to(tmp.path());
        let spec = parse_requirement_spec(path.to_str().unwrap(), None).unwrap();

        let found = LocalFileFetcher::new().find(&spec).unwrap();
        assert_eq!(found.repository_spec.version(), &Version::new(0, 4, 0));
        assert!(found.dependencies.is_empty());
    }

    #[test]
    fn test_namespace_override_renames() {
        let tmp = TempDir::new().unwrap();
        let path = CollectionFixture::new("acme", "widgets", "1.0.0").write_to(tmp.path());
        let spec = parse_requirement_spec(path.to_str().unwrap(), Some("mine")).unwrap();

        let found = LocalFileFetcher::new().find(&spec).unwrap();
        assert_eq!(found.repository_spec.label(), "mine.widgets");
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let spec = RequirementSpec::new("acme", "widgets")
            .with_fetch_method(FetchMethod::LocalFile)
            .with_source("/definitely/not/here.tar.gz");

        let err = LocalFileFetcher::new().find(&spec).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StowError>(),
            Some(StowError::NotFound { .. })
        ));
    }
}
