//! Fetcher trait - common interface for every artifact source.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;
use url::Url;

use crate::core::{FetchMethod, RepositorySpec, RequirementSpec};
use crate::util::hash::verify_sha256_file;
use crate::util::http::{download_to, HttpClient};

/// Where the artifact for a found repository lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactLocation {
    Url(Url),
    Path(PathBuf),
}

impl fmt::Display for ArtifactLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactLocation::Url(url) => write!(f, "{}", url),
            ArtifactLocation::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Location and integrity data for an artifact.
#[derive(Debug, Clone)]
pub struct ArtifactHint {
    pub location: ArtifactLocation,
    /// Declared SHA256, when the source publishes one
    pub sha256: Option<String>,
    pub size: Option<u64>,
    pub filename: Option<String>,
}

impl ArtifactHint {
    pub fn url(url: Url) -> Self {
        ArtifactHint {
            location: ArtifactLocation::Url(url),
            sha256: None,
            size: None,
            filename: None,
        }
    }

    pub fn path(path: impl Into<PathBuf>) -> Self {
        ArtifactHint {
            location: ArtifactLocation::Path(path.into()),
            sha256: None,
            size: None,
            filename: None,
        }
    }

    pub fn with_sha256(mut self, sha256: Option<String>) -> Self {
        self.sha256 = sha256.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn with_size(mut self, size: Option<u64>) -> Self {
        self.size = size;
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}

/// Result of discovery.
#[derive(Debug, Clone)]
pub struct FindResult {
    /// The concrete repository; may differ from the request (aliasing).
    pub repository_spec: RepositorySpec,
    pub artifact: ArtifactHint,
    /// Declared dependencies: `namespace.name -> constraint`
    pub dependencies: BTreeMap<String, String>,
    pub deprecated: bool,
}

/// Result of retrieval.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// Local path to the artifact. Scratch artifacts stay valid until the
    /// fetcher's `cleanup` runs.
    pub artifact_path: PathBuf,
}

/// A strategy that finds and retrieves artifacts for one fetch method.
pub trait Fetcher: Send {
    fn fetch_method(&self) -> FetchMethod;

    /// Read-only discovery: resolve the requirement to one concrete repository.
    fn find(&mut self, requirement_spec: &RequirementSpec) -> Result<FindResult>;

    /// Retrieve the artifact to local storage.
    fn fetch(&mut self, repository_spec: &RepositorySpec, find_result: &FindResult) -> Result<FetchResult>;

    /// Release scratch resources. Idempotent.
    fn cleanup(&mut self);
}

/// Lazily created scratch directory owned by a fetcher.
#[derive(Debug, Default)]
pub struct Scratch {
    dir: Option<TempDir>,
}

impl Scratch {
    pub fn new() -> Self {
        Scratch::default()
    }

    /// Path of the scratch directory, creating it on first use.
    pub fn path(&mut self) -> Result<&Path> {
        let dir = match self.dir.take() {
            Some(dir) => dir,
            None => {
                let dir = tempfile::Builder::new()
                    .prefix("stowage-")
                    .tempdir()
                    .context("failed to create scratch directory")?;
                tracing::debug!("created scratch directory {}", dir.path().display());
                dir
            }
        };

        Ok(self.dir.insert(dir).path())
    }

    pub fn is_active(&self) -> bool {
        self.dir.is_some()
    }

    /// Delete the scratch directory, if one was created.
    pub fn release(&mut self) {
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                tracing::warn!("failed to remove scratch directory {}: {}", path.display(), e);
            }
        }
    }
}

/// Download `url` to `dest` and verify its checksum when one is declared.
///
/// A file that fails verification is deleted before the error is returned.
pub fn download_verified(
    http: &dyn HttpClient,
    url: &Url,
    dest: &Path,
    sha256: Option<&str>,
) -> Result<PathBuf> {
    download_to(http, url, dest)?;

    if let Some(expected) = sha256 {
        if let Err(e) = verify_sha256_file(dest, expected) {
            let _ = std::fs::remove_file(dest);
            return Err(e);
        }
    }

    Ok(dest.to_path_buf())
}

/// File name for a downloaded artifact: the declared one, else the last URL
/// segment, else the conventional `namespace-name-version.tar.gz`.
pub fn artifact_file_name(repository_spec: &RepositorySpec, hint: &ArtifactHint) -> String {
    if let Some(name) = hint.filename.as_deref().filter(|n| is_plain_file_name(n)) {
        return name.to_string();
    }

    if let ArtifactLocation::Url(url) = &hint.location {
        if let Some(last) = url.path_segments().and_then(|mut s| s.next_back()) {
            if is_plain_file_name(last) {
                return last.to_string();
            }
        }
    }

    repository_spec.artifact_filename()
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}
