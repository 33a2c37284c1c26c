//! SCM fetcher - collections straight from a git repository.
//!
//! `find` clones into scratch and checks out either the explicit reference
//! (tag, branch or commit) or the highest semver tag satisfying the
//! constraint. `fetch` packs the checked-out tree into an artifact.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use git2::{Repository, ResetType};
use semver::Version;

use crate::archive::build_tarball_from_dir;
use crate::core::{CollectionManifest, FetchMethod, RepositorySpec, RequirementSpec, StowError, MANIFEST_FILE};
use crate::resolver::{normalize_version, select_version, ResolveError};
use crate::sources::fetcher::{ArtifactHint, ArtifactLocation, FetchResult, Fetcher, FindResult, Scratch};

/// Fetcher for [`FetchMethod::ScmUrl`].
#[derive(Debug, Default)]
pub struct ScmFetcher {
    scratch: Scratch,
}

impl ScmFetcher {
    pub fn new() -> Self {
        ScmFetcher::default()
    }

    fn clone_into(&mut self, url: &str) -> Result<(Repository, PathBuf)> {
        let checkout = self.scratch.path()?.join("checkout");
        crate::util::fs::remove_dir_all_if_exists(&checkout)?;

        tracing::info!("Cloning {}", url);
        let repo = Repository::clone(url, &checkout).map_err(|e| StowError::Download {
            url: url.to_string(),
            reason: e.message().to_string(),
        })?;

        Ok((repo, checkout))
    }
}

/// Tags of a repository that parse as versions.
fn version_tags(repo: &Repository) -> Result<Vec<String>> {
    let names = repo.tag_names(None).context("failed to list tags")?;
    Ok(names
        .iter()
        .flatten()
        .filter(|tag| normalize_version(tag).is_ok())
        .map(str::to_string)
        .collect())
}

/// Hard-reset the worktree to a tag, remote branch or revision.
fn checkout(repo: &Repository, reference: &str) -> Result<bool> {
    let object = repo
        .revparse_single(&format!("refs/tags/{}", reference))
        .or_else(|_| repo.revparse_single(&format!("refs/remotes/origin/{}", reference)))
        .or_else(|_| repo.revparse_single(reference));

    let object = match object {
        Ok(object) => object,
        Err(_) => return Ok(false),
    };

    let commit = object
        .peel_to_commit()
        .with_context(|| format!("`{}` does not point at a commit", reference))?;
    repo.reset(commit.as_object(), ResetType::Hard, None)
        .with_context(|| format!("failed to check out `{}`", reference))?;

    tracing::debug!("checked out {} at {}", reference, commit.id());
    Ok(true)
}

fn read_manifest(worktree: &Path) -> Result<Option<CollectionManifest>> {
    let path = worktree.join(MANIFEST_FILE);
    if path.is_file() {
        Ok(Some(CollectionManifest::load(&path)?))
    } else {
        Ok(None)
    }
}

impl Fetcher for ScmFetcher {
    fn fetch_method(&self) -> FetchMethod {
        FetchMethod::ScmUrl
    }

    fn find(&mut self, requirement_spec: &RequirementSpec) -> Result<FindResult> {
        let label = requirement_spec.label();
        let url = requirement_spec
            .source()
            .ok_or_else(|| StowError::InvalidSpec {
                spec: requirement_spec.to_string(),
                reason: "no repository URL given".to_string(),
            })?
            .to_string();

        let (repo, worktree) = self.clone_into(&url)?;

        // Version implied by the checked-out tag, if any.
        let tag_version: Option<Version> = match requirement_spec.scm_ref() {
            Some(reference) => {
                if !checkout(&repo, reference)? {
                    return Err(StowError::NotFound {
                        label,
                        location: format!("{} at `{}`", url, reference),
                    }
                    .into());
                }
                normalize_version(reference).ok()
            }
            None => {
                let tags = version_tags(&repo)?;
                let constraint = requirement_spec.version_constraint();
                if tags.is_empty() && constraint.is_any() {
                    tracing::debug!("{} has no version tags, using the default branch", url);
                    None
                } else {
                    let tag = select_version(&label, constraint, &tags)?;
                    checkout(&repo, &tag)?;
                    Some(normalize_version(&tag)?)
                }
            }
        };

        let manifest = read_manifest(&worktree)?;
        let dependencies = manifest
            .as_ref()
            .map(|m| m.dependencies.clone())
            .unwrap_or_default();

        let version = match (&manifest, tag_version) {
            (Some(manifest), tag) => {
                let declared = manifest.version()?;
                if let Some(tag) = tag.filter(|t| *t != declared) {
                    tracing::warn!("{}: tag {} carries {} version {}", label, tag, MANIFEST_FILE, declared);
                }
                declared
            }
            (None, Some(tag)) => tag,
            (None, None) => {
                return Err(StowError::Ambiguous {
                    label,
                    reason: format!("{} has no {} and no version tag", url, MANIFEST_FILE),
                }
                .into())
            }
        };

        if requirement_spec.scm_ref().is_none() && !requirement_spec.version_constraint().matches(&version) {
            return Err(ResolveError::NoMatchingVersion {
                label,
                constraint: requirement_spec.version_constraint().to_string(),
                available: vec![version.to_string()],
            }
            .into());
        }

        let repository_spec = RepositorySpec::new(
            requirement_spec.namespace(),
            requirement_spec.name(),
            version,
            FetchMethod::ScmUrl,
        );

        Ok(FindResult {
            repository_spec,
            artifact: ArtifactHint::path(worktree),
            dependencies,
            deprecated: false,
        })
    }

    fn fetch(&mut self, repository_spec: &RepositorySpec, find_result: &FindResult) -> Result<FetchResult> {
        let worktree = match &find_result.artifact.location {
            ArtifactLocation::Path(path) => path.clone(),
            ArtifactLocation::Url(url) => anyhow::bail!("no local checkout for {}", url),
        };

        let file_name = repository_spec.artifact_filename();
        let prefix = file_name.trim_end_matches(".tar.gz").to_string();
        let dest = self.scratch.path()?.join("artifacts").join(&file_name);

        build_tarball_from_dir(&worktree, &dest, &prefix)
            .with_context(|| format!("failed to pack {}", repository_spec))?;

        Ok(FetchResult { artifact_path: dest })
    }

    fn cleanup(&mut self) {
        self.scratch.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveInfo;
    use crate::resolver::VersionConstraint;
    use crate::test_support::CollectionFixture;
    use git2::{IndexAddOption, Signature};
    use tempfile::TempDir;

    fn commit_all(repo: &Repository, message: &str) -> git2::Oid {
        let mut index = repo.index().unwrap();
        index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now("Test", "test@example.com").unwrap();
        let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents).unwrap()
    }

    /// A repository with tags `v1.0.0` and `1.1.0`, plus an untagged 2.0.0 on HEAD.
    fn upstream() -> TempDir {
        let tmp = TempDir::new().unwrap();
        let repo = Repository::init(tmp.path()).unwrap();

        for (version, tag) in [("1.0.0", Some("v1.0.0")), ("1.1.0", Some("1.1.0")), ("2.0.0", None)] {
            CollectionFixture::new("acme", "widgets", version)
                .dependency("acme.base", ">=2.0.0")
                .write_tree(tmp.path());
            let oid = commit_all(&repo, &format!("release {}", version));
            if let Some(tag) = tag {
                let object = repo.find_object(oid, None).unwrap();
                repo.tag_lightweight(tag, &object, false).unwrap();
            }
        }
        tmp
    }

    /// A repository with two releases and no tags at all.
    fn untagged() -> TempDir {
        let tmp = TempDir::new().unwrap();
        let repo = Repository::init(tmp.path()).unwrap();

        for version in ["1.0.0", "1.3.0"] {
            CollectionFixture::new("acme", "widgets", version).write_tree(tmp.path());
            commit_all(&repo, &format!("release {}", version));
        }
        tmp
    }

    fn spec(upstream: &TempDir) -> RequirementSpec {
        RequirementSpec::new("acme", "widgets")
            .with_fetch_method(FetchMethod::ScmUrl)
            .with_source(upstream.path().to_str().unwrap())
    }

    #[test]
    fn test_find_highest_tag() {
        let upstream = upstream();
        let found = ScmFetcher::new().find(&spec(&upstream)).unwrap();
        assert_eq!(found.repository_spec.version(), &Version::new(1, 1, 0));
        assert_eq!(found.dependencies["acme.base"], ">=2.0.0");
    }

    #[test]
    fn test_untagged_repo_uses_default_branch_for_any() {
        let upstream = untagged();
        let found = ScmFetcher::new().find(&spec(&upstream)).unwrap();

        assert_eq!(found.repository_spec.version(), &Version::new(1, 3, 0));
        assert!(matches!(found.artifact.location, ArtifactLocation::Path(_)));
    }

    #[test]
    fn test_untagged_repo_with_constraint_has_no_versions() {
        let upstream = untagged();
        let spec = spec(&upstream).with_constraint(VersionConstraint::parse(">=1.0.0").unwrap());

        let err = ScmFetcher::new().find(&spec).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ResolveError>(),
            Some(ResolveError::NoVersionsAvailable { .. })
        ));
    }

    #[test]
    fn test_find_constrained_tag() {
        let upstream = upstream();
        let spec = spec(&upstream).with_constraint(VersionConstraint::parse("<1.1.0").unwrap());
        let found = ScmFetcher::new().find(&spec).unwrap();
        assert_eq!(found.repository_spec.version(), &Version::new(1, 0, 0));
    }

    #[test]
    fn test_find_explicit_ref() {
        let upstream = upstream();
        let head = Repository::open(upstream.path())
            .unwrap()
            .head()
            .unwrap()
            .shorthand()
            .unwrap()
            .to_string();

        let found = ScmFetcher::new().find(&spec(&upstream).with_scm_ref(head)).unwrap();
        assert_eq!(found.repository_spec.version(), &Version::new(2, 0, 0));

        let err = ScmFetcher::new()
            .find(&spec(&upstream).with_scm_ref("no-such-branch"))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StowError>(),
            Some(StowError::NotFound { .. })
        ));
    }

    #[test]
    fn test_fetch_packs_checkout() {
        let upstream = upstream();
        let mut fetcher = ScmFetcher::new();
        let found = fetcher.find(&spec(&upstream)).unwrap();
        let fetched = fetcher.fetch(&found.repository_spec, &found).unwrap();

        let info = ArchiveInfo::inspect(&fetched.artifact_path).unwrap();
        assert_eq!(info.top_dir.as_deref(), Some("acme-widgets-1.1.0"));
        assert_eq!(info.manifest.unwrap().collection.version, "1.1.0");

        fetcher.cleanup();
        assert!(!fetched.artifact_path.exists());
    }

    #[test]
    fn test_clone_failure_is_download_error() {
        let spec = RequirementSpec::new("acme", "widgets")
            .with_fetch_method(FetchMethod::ScmUrl)
            .with_source("/definitely/not/a/repo");

        let err = ScmFetcher::new().find(&spec).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StowError>(),
            Some(StowError::Download { .. })
        ));
    }
}
