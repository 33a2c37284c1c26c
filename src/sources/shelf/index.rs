//! Shelf index files.
//!
//! ```text
//! {shelf}/index.json                 root index, one entry per content type
//! {shelf}/<location>                 sub-index listing artifacts
//! ```

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::Deserialize;
use url::Url;

use crate::util::hash::verify_sha256_bytes;
use crate::util::http::{as_directory, get_bytes, resolve_url, HttpClient};

/// File name of the root index.
pub const ROOT_INDEX: &str = "index.json";

/// Content type of the sub-index this crate consumes.
pub const COLLECTIONS_INDEX: &str = "collections";

/// `{shelf}/index.json`
#[derive(Debug, Clone, Deserialize)]
pub struct RootIndex {
    #[serde(default)]
    pub serial_number: u64,
    #[serde(default)]
    pub indexes: Vec<IndexRef>,
}

/// Pointer from the root index to a sub-index.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexRef {
    pub index_type: String,
    pub location: String,
    #[serde(default)]
    pub sha256: Option<String>,
    #[serde(default)]
    pub size_bytes: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
struct CollectionsIndex {
    #[serde(default)]
    collections: Vec<ShelfEntry>,
}

/// One artifact listed on a shelf.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ShelfEntry {
    pub namespace: String,
    pub name: String,
    pub version: String,
    /// Artifact path relative to the shelf root
    pub path: String,
    #[serde(default)]
    pub sha256: Option<String>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

impl ShelfEntry {
    pub fn label(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }
}

/// The collections listed on one shelf.
#[derive(Debug, Clone)]
pub struct ShelfIndex {
    pub base: Url,
    pub serial_number: u64,
    pub entries: Vec<ShelfEntry>,
}

impl ShelfIndex {
    /// Load the root index and every collections sub-index.
    pub fn load(http: &dyn HttpClient, shelf: &Url) -> Result<Self> {
        let base = as_directory(shelf);
        let root_url = resolve_url(&base, ROOT_INDEX)?;

        let root: RootIndex = serde_json::from_slice(&get_bytes(http, &root_url)?)
            .with_context(|| format!("invalid shelf index {}", root_url))?;
        tracing::debug!("shelf {} serial {}", base, root.serial_number);

        let mut entries = Vec::new();
        for index in root.indexes.iter().filter(|i| i.index_type == COLLECTIONS_INDEX) {
            let url = resolve_url(&base, &index.location)?;
            let body = get_bytes(http, &url)?;

            if let Some(expected) = index.sha256.as_deref().filter(|s| !s.is_empty()) {
                verify_sha256_bytes(url.as_str(), &body, expected)?;
            }

            let sub: CollectionsIndex = serde_json::from_slice(&body)
                .with_context(|| format!("invalid shelf sub-index {}", url))?;
            entries.extend(sub.collections);
        }

        Ok(ShelfIndex {
            base,
            serial_number: root.serial_number,
            entries,
        })
    }

    /// Entries for one collection.
    pub fn entries_for<'a>(&'a self, namespace: &'a str, name: &'a str) -> impl Iterator<Item = &'a ShelfEntry> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.namespace == namespace && e.name == name)
    }

    /// Absolute URL of an entry's artifact.
    pub fn artifact_url(&self, entry: &ShelfEntry) -> Result<Url> {
        resolve_url(&self.base, &entry.path)
    }
}
