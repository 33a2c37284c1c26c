//! `collection.toml` parsing and schema.
//!
//! Every collection artifact carries this file at the top of its archive.
//! Legacy single-item packages (roles) do not.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::core::spec_parse::requirement_spec_from_dependency;
use crate::resolver::normalize_version;

/// File name of the collection manifest.
pub const MANIFEST_FILE: &str = "collection.toml";

/// Parsed `collection.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionManifest {
    /// Identity and descriptive metadata
    pub collection: CollectionInfo,

    /// Declared dependencies: `"namespace.name" -> "<constraint>"`
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

/// The `[collection]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub namespace: String,

    pub name: String,

    /// Version (strict semver, a leading `v` is tolerated)
    pub version: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub authors: Vec<String>,

    #[serde(default)]
    pub license: Option<String>,

    #[serde(default)]
    pub repository: Option<String>,
}

impl CollectionManifest {
    /// Load from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = crate::util::fs::read_to_string(path).context("failed to read manifest")?;

        Self::parse(&content).with_context(|| format!("in {}", path.display()))
    }

    /// Parse manifest content.
    pub fn parse(content: &str) -> Result<Self> {
        let manifest: CollectionManifest =
            toml::from_str(content).with_context(|| format!("failed to parse {}", MANIFEST_FILE))?;

        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<()> {
        if self.collection.namespace.trim().is_empty() {
            bail!("{}: `namespace` must not be empty", MANIFEST_FILE);
        }
        if self.collection.name.trim().is_empty() {
            bail!("{}: `name` must not be empty", MANIFEST_FILE);
        }
        self.version()?;

        for (label, constraint) in &self.dependencies {
            // Flattened: a bad entry fails this artifact only, never the run.
            if let Err(e) = requirement_spec_from_dependency(label, constraint) {
                bail!("{}: invalid dependency `{}`: {:#}", MANIFEST_FILE, label, e);
            }
        }

        Ok(())
    }

    /// Parse the version string as semver.
    pub fn version(&self) -> Result<Version> {
        normalize_version(&self.collection.version)
            .with_context(|| format!("invalid version in {}", MANIFEST_FILE))
    }

    /// `namespace.name`
    pub fn label(&self) -> String {
        format!("{}.{}", self.collection.namespace, self.collection.name)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize collection manifest")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_manifest() {
        let manifest = CollectionManifest::parse(
            r#"
[collection]
namespace = "acme"
name = "widgets"
version = "1.2.0"
description = "Widgets for everyone"
authors = ["Jane Doe"]

[dependencies]
"acme.base" = ">=2.0.0"
"other.thing" = "*"
"#,
        )
        .unwrap();

        assert_eq!(manifest.label(), "acme.widgets");
        assert_eq!(manifest.version().unwrap(), Version::new(1, 2, 0));
        assert_eq!(manifest.dependencies.len(), 2);
        assert_eq!(manifest.dependencies["acme.base"], ">=2.0.0");
    }

    #[test]
    fn test_dependencies_default_to_empty() {
        let manifest = CollectionManifest::parse(
            "[collection]\nnamespace = \"acme\"\nname = \"base\"\nversion = \"v2.0.0\"\n",
        )
        .unwrap();

        assert!(manifest.dependencies.is_empty());
        assert_eq!(manifest.version().unwrap(), Version::new(2, 0, 0));
    }

    #[test]
    fn test_rejects_bad_version() {
        let err = CollectionManifest::parse(
            "[collection]\nnamespace = \"acme\"\nname = \"base\"\nversion = \"2.0\"\n",
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("invalid version"));
    }

    #[test]
    fn test_rejects_undotted_dependency() {
        let err = CollectionManifest::parse(
            "[collection]\nnamespace = \"acme\"\nname = \"base\"\nversion = \"1.0.0\"\n\n[dependencies]\nbase = \"*\"\n",
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("namespace.name"));
    }

    #[test]
    fn test_rejects_dependency_the_index_cannot_read() {
        let header = "[collection]\nnamespace = \"acme\"\nname = \"gadgets\"\nversion = \"1.0.0\"\n\n[dependencies]\n";

        let bad_constraint =
            CollectionManifest::parse(&format!("{}\"acme.base\" = \"latest\"\n", header)).unwrap_err();
        assert!(format!("{:#}", bad_constraint).contains("invalid dependency `acme.base`"));

        let three_part =
            CollectionManifest::parse(&format!("{}\"a.b.c\" = \"*\"\n", header)).unwrap_err();
        assert!(format!("{:#}", three_part).contains("invalid dependency `a.b.c`"));
    }

    #[test]
    fn test_roundtrip_through_toml() {
        let manifest = CollectionManifest::parse(
            "[collection]\nnamespace = \"acme\"\nname = \"base\"\nversion = \"1.0.0\"\n",
        )
        .unwrap();
        let text = manifest.to_toml().unwrap();
        let again = CollectionManifest::parse(&text).unwrap();
        assert_eq!(again.label(), "acme.base");
    }
}
