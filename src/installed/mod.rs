//! Installed package index - a read-only view of the content root.
//!
//! ```text
//! <content_root>/
//! └── <namespace>/
//!     └── <name>/
//!         ├── collection.toml          (collections)
//!         ├── roles/<name>/meta/main.yml (roles)
//!         └── meta/.install_info.toml
//! ```
//!
//! Every query rescans the tree, so each pass of the install loop sees the
//! installs completed earlier in the same run.

pub mod matcher;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::{
    requirements_from_dependencies, CollectionManifest, FetchMethod, InstallInfo,
    InstalledRepository, RepositorySpec, RequirementSpec, MANIFEST_FILE,
};
use crate::resolver::normalize_version;
use crate::util::fs::sorted_subdirs;

pub use matcher::{
    MatchAll, MatchLabels, MatchNamespaces, MatchNamespacesOrLabels, MatchNone,
    MatchRepositorySpec, MatchRequirementSpec, Matcher,
};

/// Marker of a legacy role, relative to its content directory.
const ROLE_MARKER: &str = "meta/main.yml";

/// Query layer over `<content_root>/<namespace>/<name>`.
#[derive(Debug, Clone)]
pub struct InstalledIndex {
    root: PathBuf,
}

impl InstalledIndex {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        InstalledIndex { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All installed repositories accepted by `matcher`, sorted by
    /// namespace then name.
    ///
    /// Directories with missing or unreadable install metadata are skipped
    /// with a warning.
    pub fn list(&self, matcher: &dyn Matcher) -> Result<Vec<InstalledRepository>> {
        if !self.root.is_dir() {
            tracing::debug!("content root {} does not exist", self.root.display());
            return Ok(Vec::new());
        }

        let mut found = Vec::new();
        for namespace_dir in visible_subdirs(&self.root)? {
            for repo_dir in visible_subdirs(&namespace_dir)? {
                match load_installed(&namespace_dir, &repo_dir) {
                    Ok(Some(installed)) => {
                        if matcher.matches(&installed) {
                            found.push(installed);
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!("skipping {}: {:#}", repo_dir.display(), e);
                    }
                }
            }
        }

        Ok(found)
    }

    /// Installs of the same `namespace.name` whose version satisfies the
    /// requirement's constraint.
    pub fn find_by_requirement_spec(
        &self,
        requirement_spec: &RequirementSpec,
    ) -> Result<Vec<InstalledRepository>> {
        self.list(&MatchRequirementSpec::new(requirement_spec))
    }

    /// Installs of exactly this namespace, name and version.
    pub fn find_by_repository_spec(
        &self,
        repository_spec: &RepositorySpec,
    ) -> Result<Vec<InstalledRepository>> {
        self.list(&MatchRepositorySpec::new(repository_spec))
    }

    /// Any installed version of `namespace.name`.
    pub fn find_by_label(&self, namespace: &str, name: &str) -> Result<Vec<InstalledRepository>> {
        let label = format!("{}.{}", namespace, name);
        self.list(&MatchLabels::new([label]))
    }
}

/// Subdirectories, excluding the executor's dot-prefixed staging dirs.
fn visible_subdirs(dir: &Path) -> Result<Vec<PathBuf>> {
    Ok(sorted_subdirs(dir)?
        .into_iter()
        .filter(|p| {
            p.file_name()
                .map(|n| !n.to_string_lossy().starts_with('.'))
                .unwrap_or(false)
        })
        .collect())
}

/// Rebuild one record. `Ok(None)` for directories that were never installed
/// by this tool (no install metadata at all).
fn load_installed(namespace_dir: &Path, repo_dir: &Path) -> Result<Option<InstalledRepository>> {
    if !InstallInfo::path_in(repo_dir).exists() {
        tracing::warn!(
            "{} has no install metadata, ignoring it",
            repo_dir.display()
        );
        return Ok(None);
    }

    let install_info = InstallInfo::load(repo_dir)?;
    let version = normalize_version(&install_info.version)
        .with_context(|| format!("bad version in {}", InstallInfo::path_in(repo_dir).display()))?;

    let namespace = dir_name(namespace_dir)?;
    let name = dir_name(repo_dir)?;

    let repository_spec = RepositorySpec::new(
        namespace,
        name.clone(),
        version,
        install_info.fetch_method.unwrap_or(FetchMethod::Registry),
    );

    let manifest_path = repo_dir.join(MANIFEST_FILE);
    let is_role = !manifest_path.exists() && repo_dir.join("roles").join(&name).join(ROLE_MARKER).exists();

    let requirements = if manifest_path.exists() {
        let manifest = CollectionManifest::load(&manifest_path)?;
        requirements_from_dependencies(&manifest.dependencies, &repository_spec)?
    } else {
        Vec::new()
    };

    Ok(Some(InstalledRepository {
        repository_spec,
        path: repo_dir.to_path_buf(),
        requirements,
        install_info,
        is_role,
    }))
}

fn dir_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .with_context(|| format!("{} has no directory name", path.display()))
}
