//! InstalledRepository - a collection present under the content root.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use super::install_info::InstallInfo;
use super::repository_spec::RepositorySpec;
use super::requirement::Requirement;

/// On-disk state of one installed collection.
#[derive(Debug, Clone)]
pub struct InstalledRepository {
    pub repository_spec: RepositorySpec,
    /// `<content_root>/<namespace>/<name>`
    pub path: PathBuf,
    /// Dependencies declared by the installed manifest.
    pub requirements: Vec<Requirement>,
    pub install_info: InstallInfo,
    /// Whether this is a legacy single-item package under `roles/<name>`.
    pub is_role: bool,
}

impl InstalledRepository {
    pub fn label(&self) -> String {
        self.repository_spec.label()
    }

    pub fn install_path(&self) -> &Path {
        &self.path
    }

    pub fn install_timestamp(&self) -> DateTime<Utc> {
        self.install_info.install_date_iso
    }

    /// Directory holding the package content.
    pub fn content_dir(&self) -> PathBuf {
        if self.is_role {
            self.path.join("roles").join(self.repository_spec.name())
        } else {
            self.path.clone()
        }
    }
}
