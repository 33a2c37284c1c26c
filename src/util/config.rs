//! Configuration file support.
//!
//! The user configuration lives at `~/.stowage/config.toml`:
//!
//! ```toml
//! [server]
//! url = "https://galaxy.ansible.com"
//! ignore_certs = false
//!
//! [content]
//! path = "/home/me/.stowage/collections"
//!
//! [shelves.mirror]
//! uri = "https://mirror.example.com/shelf/"
//! ```
//!
//! Command-line flags override anything read from the file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Registry used when nothing else is configured.
pub const DEFAULT_SERVER_URL: &str = "https://galaxy.ansible.com";

/// Shelf configured out of the box.
pub const DEFAULT_SHELF_NAME: &str = "system";
pub const DEFAULT_SHELF_URI: &str = "file:///usr/share/stowage/shelf";

/// Name of the per-user configuration directory under `$HOME`.
pub const STOWAGE_DIR: &str = ".stowage";

/// Stowage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,

    pub content: ContentConfig,

    /// Named static shelves
    pub shelves: BTreeMap<String, ShelfConfig>,
}

impl Default for Config {
    fn default() -> Self {
        let mut shelves = BTreeMap::new();
        shelves.insert(
            DEFAULT_SHELF_NAME.to_string(),
            ShelfConfig {
                uri: DEFAULT_SHELF_URI.to_string(),
            },
        );

        Config {
            server: ServerConfig::default(),
            content: ContentConfig::default(),
            shelves,
        }
    }
}

/// Registry server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub url: String,

    /// Skip TLS certificate validation
    pub ignore_certs: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            url: default_server_url(),
            ignore_certs: false,
        }
    }
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

/// Install location settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Content root; defaults to `~/.stowage/collections`
    pub path: Option<PathBuf>,
}

/// One shelf entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShelfConfig {
    pub uri: String,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = crate::util::fs::read_to_string(path).context("failed to read config file")?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration, falling back to defaults when the file does not exist.
    ///
    /// A file that exists but cannot be parsed is an error.
    pub fn load_if_exists(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("no config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("failed to serialize config")?;
        crate::util::fs::write_string(path, &contents)
    }
}

/// `~/.stowage`, if a home directory can be determined.
pub fn stowage_home() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().join(STOWAGE_DIR))
}

/// `~/.stowage/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    stowage_home().map(|home| home.join("config.toml"))
}
