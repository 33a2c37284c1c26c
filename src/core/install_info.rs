//! Install metadata written next to every installed collection.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use super::requirement_spec::FetchMethod;

/// Location of the install metadata, relative to `<root>/<namespace>/<name>/`.
pub const INSTALL_INFO_PATH: &str = "meta/.install_info.toml";

/// Contents of `meta/.install_info.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallInfo {
    /// Installed version
    pub version: String,

    /// Install time as a locale-style string (`%c`)
    pub install_date: String,

    /// Install time as an RFC 3339 UTC timestamp
    pub install_date_iso: DateTime<Utc>,

    /// How the artifact was obtained
    #[serde(default)]
    pub fetch_method: Option<FetchMethod>,
}

impl InstallInfo {
    /// Metadata for an install happening now.
    pub fn now(version: impl Into<String>, fetch_method: FetchMethod) -> Self {
        Self::at(version, fetch_method, Utc::now())
    }

    /// Metadata for an install at a given time.
    pub fn at(version: impl Into<String>, fetch_method: FetchMethod, when: DateTime<Utc>) -> Self {
        InstallInfo {
            version: version.into(),
            install_date: when.with_timezone(&Local).format("%c").to_string(),
            install_date_iso: when,
            fetch_method: Some(fetch_method),
        }
    }

    /// Path of the metadata file for a repository directory.
    pub fn path_in(repo_dir: &Path) -> PathBuf {
        repo_dir.join(INSTALL_INFO_PATH)
    }

    /// Load from a repository directory.
    pub fn load(repo_dir: &Path) -> Result<Self> {
        let path = Self::path_in(repo_dir);
        let content = crate::util::fs::read_to_string(&path).context("failed to read install info")?;

        toml::from_str(&content)
            .with_context(|| format!("failed to parse install info: {}", path.display()))
    }

    /// Write into a repository directory.
    pub fn save(&self, repo_dir: &Path) -> Result<()> {
        let path = Self::path_in(repo_dir);
        let content = toml::to_string_pretty(self).context("failed to serialize install info")?;
        crate::util::fs::write_string(&path, &content)
    }
}
