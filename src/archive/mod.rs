//! Artifact inspection and the install executor.
//!
//! The orchestrator hands a fetched artifact and a resolved
//! [`RepositorySpec`] to an [`InstallExecutor`]. The production executor,
//! [`ArchiveInstaller`], extracts into a hidden staging directory next to
//! the destination and renames it into place, so readers of the content
//! root never observe a half-extracted collection.

pub mod extract;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::{CollectionManifest, InstallInfo, RepositorySpec, StowError, MANIFEST_FILE};
use crate::util::fs;

pub use extract::{build_tarball_from_dir, extract_tarball};

/// Marker file identifying a legacy role.
const ROLE_MARKER: &str = "meta/main.yml";

/// What an artifact contains, sniffed without extracting it.
#[derive(Debug, Clone, Default)]
pub struct ArchiveInfo {
    /// Single top-level directory shared by every entry, if any.
    pub top_dir: Option<String>,
    pub manifest: Option<CollectionManifest>,
    pub is_role: bool,
}

impl ArchiveInfo {
    /// Inspect a gzipped tarball.
    pub fn inspect(path: &Path) -> Result<Self> {
        let entries = extract::list_entries(path)?;
        let top_dir = common_top_dir(&entries);

        let in_top = |file: &str| match &top_dir {
            Some(top) => format!("{}/{}", top, file),
            None => file.to_string(),
        };

        let manifest_entry = in_top(MANIFEST_FILE);
        let manifest = if entries.contains(&manifest_entry) {
            let data = extract::read_entry(path, &manifest_entry)?.unwrap_or_default();
            let text = String::from_utf8(data)
                .with_context(|| format!("{} in {} is not UTF-8", MANIFEST_FILE, path.display()))?;
            Some(
                CollectionManifest::parse(&text)
                    .with_context(|| format!("in artifact {}", path.display()))?,
            )
        } else {
            None
        };

        let is_role = manifest.is_none() && entries.contains(&in_top(ROLE_MARKER));

        Ok(ArchiveInfo {
            top_dir,
            manifest,
            is_role,
        })
    }

    /// Declared dependencies; empty for roles.
    pub fn dependencies(&self) -> BTreeMap<String, String> {
        self.manifest
            .as_ref()
            .map(|m| m.dependencies.clone())
            .unwrap_or_default()
    }
}

/// The top-level directory all entries live under, if there is exactly one.
fn common_top_dir(entries: &[String]) -> Option<String> {
    let mut top: Option<&str> = None;
    let mut nested = false;

    for entry in entries {
        let trimmed = entry.trim_end_matches('/');
        let (first, rest) = match trimmed.split_once('/') {
            Some((first, rest)) => (first, Some(rest)),
            None => (trimmed, None),
        };
        if rest.is_some() {
            nested = true;
        } else if !entry.ends_with('/') && entries.iter().all(|e| !e.starts_with(&format!("{}/", first))) {
            // A plain file at the top level.
            return None;
        }

        match top {
            None => top = Some(first),
            Some(existing) if existing != first => return None,
            Some(_) => {}
        }
    }

    if nested {
        top.map(str::to_string)
    } else {
        None
    }
}

/// Read `collection.toml` from an artifact. `None` for manifest-less roles.
pub fn read_collection_manifest(path: &Path) -> Result<Option<CollectionManifest>> {
    Ok(ArchiveInfo::inspect(path)?.manifest)
}

/// Installs a fetched artifact into the content root.
pub trait InstallExecutor: Send + Sync {
    /// Extract `artifact` for `repository_spec` under `content_root` and
    /// write install metadata. Returns the installed files, relative to the
    /// collection directory.
    fn install(
        &self,
        repository_spec: &RepositorySpec,
        artifact: &Path,
        content_root: &Path,
        force: bool,
    ) -> Result<Vec<PathBuf>>;
}

/// Tarball-based [`InstallExecutor`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ArchiveInstaller;

impl ArchiveInstaller {
    pub fn new() -> Self {
        ArchiveInstaller
    }

    fn install_inner(
        &self,
        repository_spec: &RepositorySpec,
        artifact: &Path,
        content_root: &Path,
        force: bool,
    ) -> Result<Vec<PathBuf>> {
        let info = ArchiveInfo::inspect(artifact)?;

        if let Some(manifest) = &info.manifest {
            if manifest.label() != repository_spec.label() {
                tracing::debug!(
                    "artifact declares {}, installing as {}",
                    manifest.label(),
                    repository_spec.label()
                );
            }
        }

        let namespace_dir = content_root.join(repository_spec.namespace());
        let repo_dir = namespace_dir.join(repository_spec.name());

        if repo_dir.exists() && !force {
            anyhow::bail!(
                "{} already exists; use --force to replace it",
                repo_dir.display()
            );
        }

        fs::ensure_dir(&namespace_dir)?;
        let staging = tempfile::Builder::new()
            .prefix(&format!(".{}-", repository_spec.name()))
            .tempdir_in(&namespace_dir)
            .with_context(|| format!("failed to create staging directory in {}", namespace_dir.display()))?;

        let content_dir = if info.is_role {
            staging.path().join("roles").join(repository_spec.name())
        } else {
            staging.path().to_path_buf()
        };

        tracing::debug!(
            "extracting {} into {}",
            artifact.display(),
            content_dir.display()
        );
        extract_tarball(artifact, &content_dir, info.top_dir.as_deref())?;

        InstallInfo::now(
            repository_spec.version().to_string(),
            repository_spec.fetch_method(),
        )
        .save(staging.path())?;

        // Move any previous install aside so it can be restored if the final
        // rename fails.
        let previous = if repo_dir.exists() {
            let holder = tempfile::Builder::new()
                .prefix(&format!(".{}-old-", repository_spec.name()))
                .tempdir_in(&namespace_dir)
                .context("failed to create backup directory")?;
            let backup = holder.path().join(repository_spec.name());
            std::fs::rename(&repo_dir, &backup).with_context(|| {
                format!("failed to move aside existing install {}", repo_dir.display())
            })?;
            Some((holder, backup))
        } else {
            None
        };

        if let Err(e) = std::fs::rename(staging.path(), &repo_dir) {
            if let Some((_, backup)) = &previous {
                let _ = std::fs::rename(backup, &repo_dir);
            }
            return Err(e).with_context(|| {
                format!("failed to move staged install into {}", repo_dir.display())
            });
        }

        // `staging` now points at a path that no longer exists; dropping it
        // is a no-op. Dropping `previous` deletes the old install.
        drop(previous);

        fs::list_files_relative(&repo_dir)
    }
}

impl InstallExecutor for ArchiveInstaller {
    fn install(
        &self,
        repository_spec: &RepositorySpec,
        artifact: &Path,
        content_root: &Path,
        force: bool,
    ) -> Result<Vec<PathBuf>> {
        self.install_inner(repository_spec, artifact, content_root, force)
            .map_err(|e| {
                StowError::Install {
                    label: repository_spec.label(),
                    reason: format!("{:#}", e),
                }
                .into()
            })
    }
}
