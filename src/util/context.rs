//! Global context for stowage operations.
//!
//! Every operation receives a [`GlobalContext`] instead of reading
//! process-wide defaults. It is built once, from the config file plus
//! command-line overrides, and validated at construction.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use url::Url;

use super::config::{self, Config};

/// URL schemes accepted for the registry server and shelves.
const SUPPORTED_SCHEMES: &[&str] = &["http", "https", "file"];

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ContextOverrides {
    /// Explicit config file instead of `~/.stowage/config.toml`
    pub config_path: Option<PathBuf>,
    pub server: Option<String>,
    pub ignore_certs: bool,
    pub content_path: Option<PathBuf>,
}

/// Validated settings shared by every operation.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Registry server
    server: Url,

    /// Skip TLS certificate validation
    ignore_certs: bool,

    /// Root of the installed namespace/name tree
    content_root: PathBuf,

    /// Named shelves
    shelves: BTreeMap<String, Url>,

    /// `~/.stowage`
    home: PathBuf,
}

impl GlobalContext {
    /// Create a context with an explicit server and content root and no shelves.
    pub fn new(server: &str, ignore_certs: bool, content_root: impl Into<PathBuf>) -> Result<Self> {
        let content_root = content_root.into();
        let home = config::stowage_home().unwrap_or_else(|| PathBuf::from(config::STOWAGE_DIR));

        Ok(GlobalContext {
            server: parse_location("server", server)?,
            ignore_certs,
            content_root,
            shelves: BTreeMap::new(),
            home,
        })
    }

    /// Build from a parsed config, applying command-line overrides.
    pub fn from_config(config: &Config, overrides: &ContextOverrides) -> Result<Self> {
        let home = config::stowage_home().unwrap_or_else(|| PathBuf::from(config::STOWAGE_DIR));

        let server = overrides.server.as_deref().unwrap_or(&config.server.url);
        let content_root = overrides
            .content_path
            .clone()
            .or_else(|| config.content.path.clone())
            .unwrap_or_else(|| home.join("collections"));

        let mut ctx = GlobalContext::new(
            server,
            overrides.ignore_certs || config.server.ignore_certs,
            content_root,
        )?;
        ctx.home = home;

        for (name, shelf) in &config.shelves {
            ctx = ctx.with_shelf(name, &shelf.uri)?;
        }

        Ok(ctx)
    }

    /// Load the config file (explicit or default location) and apply overrides.
    pub fn load(overrides: &ContextOverrides) -> Result<Self> {
        let config = match &overrides.config_path {
            Some(path) => Config::load(path)?,
            None => match config::default_config_path() {
                Some(path) => Config::load_if_exists(&path)?,
                None => Config::default(),
            },
        };

        Self::from_config(&config, overrides)
    }

    /// Register a shelf under `name`.
    pub fn with_shelf(mut self, name: &str, uri: &str) -> Result<Self> {
        let url = parse_location(&format!("shelf `{}`", name), uri)?;
        self.shelves.insert(name.to_string(), url);
        Ok(self)
    }

    pub fn server(&self) -> &Url {
        &self.server
    }

    pub fn ignore_certs(&self) -> bool {
        self.ignore_certs
    }

    pub fn content_root(&self) -> &Path {
        &self.content_root
    }

    pub fn shelf(&self, name: &str) -> Option<&Url> {
        self.shelves.get(name)
    }

    pub fn shelves(&self) -> &BTreeMap<String, Url> {
        &self.shelves
    }

    pub fn home(&self) -> &Path {
        &self.home
    }
}

fn parse_location(what: &str, text: &str) -> Result<Url> {
    let url = Url::parse(text.trim())
        .with_context(|| format!("invalid {} URL `{}`", what, text))?;

    if !SUPPORTED_SCHEMES.contains(&url.scheme()) {
        bail!(
            "unsupported {} URL scheme `{}` in `{}` (expected http, https or file)",
            what,
            url.scheme(),
            text
        );
    }

    Ok(url)
}
