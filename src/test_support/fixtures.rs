//! Test fixtures for common test scenarios.
//!
//! [`CollectionFixture`] builds collection artifacts in memory, writes them
//! to disk as `namespace-name-version.tar.gz`, or lays them out directly in a
//! content root as if they had already been installed.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::core::manifest::CollectionInfo;
use crate::core::{CollectionManifest, FetchMethod, InstallInfo};
use crate::util::hash::sha256_bytes;

/// Fixture for one collection (or legacy role) artifact.
#[derive(Debug, Clone)]
pub struct CollectionFixture {
    pub namespace: String,
    pub name: String,
    pub version: String,
    /// `namespace.name -> constraint`
    pub dependencies: BTreeMap<String, String>,
    /// Extra files (path relative to the artifact top directory -> content).
    pub files: BTreeMap<String, String>,
    /// Legacy role layout: `meta/main.yml` and no `collection.toml`.
    pub is_role: bool,
}

impl CollectionFixture {
    /// A collection with a manifest and a single module file.
    pub fn new(namespace: &str, name: &str, version: &str) -> Self {
        let mut files = BTreeMap::new();
        files.insert(
            format!("plugins/modules/{}.py", name),
            format!("# {}.{} {}\n", namespace, name, version),
        );

        CollectionFixture {
            namespace: namespace.to_string(),
            name: name.to_string(),
            version: version.to_string(),
            dependencies: BTreeMap::new(),
            files,
            is_role: false,
        }
    }

    /// A legacy role without a collection manifest.
    pub fn role(namespace: &str, name: &str, version: &str) -> Self {
        let mut files = BTreeMap::new();
        files.insert(
            "meta/main.yml".to_string(),
            format!("galaxy_info:\n  role_name: {}\n  namespace: {}\n", name, namespace),
        );
        files.insert("tasks/main.yml".to_string(), "- debug: msg=hi\n".to_string());

        CollectionFixture {
            namespace: namespace.to_string(),
            name: name.to_string(),
            version: version.to_string(),
            dependencies: BTreeMap::new(),
            files,
            is_role: true,
        }
    }

    /// Add a declared dependency.
    pub fn dependency(mut self, label: &str, constraint: &str) -> Self {
        self.dependencies
            .insert(label.to_string(), constraint.to_string());
        self
    }

    /// Add an extra file.
    pub fn file(mut self, path: &str, content: &str) -> Self {
        self.files.insert(path.to_string(), content.to_string());
        self
    }

    pub fn label(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    /// `namespace-name-version.tar.gz`
    pub fn artifact_filename(&self) -> String {
        format!("{}-{}-{}.tar.gz", self.namespace, self.name, self.version)
    }

    /// The `collection.toml` this fixture carries.
    pub fn manifest(&self) -> CollectionManifest {
        CollectionManifest {
            collection: CollectionInfo {
                namespace: self.namespace.clone(),
                name: self.name.clone(),
                version: self.version.clone(),
                description: Some(format!("Test collection {}", self.label())),
                authors: vec!["Test Author".to_string()],
                license: Some("MIT".to_string()),
                repository: None,
            },
            dependencies: self.dependencies.clone(),
        }
    }

    /// All files of the artifact, relative to its top directory.
    pub fn contents(&self) -> BTreeMap<String, String> {
        let mut contents = self.files.clone();
        if !self.is_role {
            contents.insert(
                crate::core::MANIFEST_FILE.to_string(),
                self.manifest().to_toml().expect("serialize fixture manifest"),
            );
        }
        contents
    }

    /// Build the gzipped tarball, with everything under `namespace-name-version/`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let top = format!("{}-{}-{}", self.namespace, self.name, self.version);
        let entries: Vec<(String, String)> = self
            .contents()
            .into_iter()
            .map(|(path, content)| (format!("{}/{}", top, path), content))
            .collect();
        tarball(&entries)
    }

    /// SHA256 of [`to_bytes`](Self::to_bytes).
    pub fn sha256(&self) -> String {
        sha256_bytes(&self.to_bytes())
    }

    /// Write the artifact into `dir`, returning its path.
    pub fn write_to(&self, dir: &Path) -> PathBuf {
        std::fs::create_dir_all(dir).expect("create fixture dir");
        let path = dir.join(self.artifact_filename());
        std::fs::write(&path, self.to_bytes()).expect("write fixture artifact");
        path
    }

    /// Write the unpacked tree into `dir` (for SCM repositories).
    pub fn write_tree(&self, dir: &Path) {
        for (path, content) in self.contents() {
            let full = dir.join(path);
            std::fs::create_dir_all(full.parent().expect("fixture path has a parent"))
                .expect("create fixture dir");
            std::fs::write(full, content).expect("write fixture file");
        }
    }

    /// Lay the fixture out under a content root as an installed collection.
    pub fn install_into(&self, content_root: &Path) -> PathBuf {
        let repo_dir = content_root.join(&self.namespace).join(&self.name);
        let content_dir = if self.is_role {
            repo_dir.join("roles").join(&self.name)
        } else {
            repo_dir.clone()
        };

        self.write_tree(&content_dir);
        InstallInfo::now(&self.version, FetchMethod::LocalFile)
            .save(&repo_dir)
            .expect("write fixture install info");
        repo_dir
    }
}

/// Build a gzipped tarball from `(path, content)` pairs.
pub fn tarball(entries: &[(String, String)]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (path, content) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header
            .set_path(path)
            .expect("fixture tar path");
        header.set_cksum();
        builder
            .append(&header, content.as_bytes())
            .expect("append fixture entry");
    }

    builder
        .into_inner()
        .and_then(|encoder| encoder.finish())
        .expect("finish fixture tarball")
}

/// Build a gzipped tarball whose entry names are written verbatim.
///
/// `tar::Header::set_path` refuses `..` components, so this writes the raw
/// name field to produce archives that try to escape their destination.
pub fn raw_tarball(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut tar_bytes = Vec::new();
    {
        let mut builder = tar::Builder::new(&mut tar_bytes);
        for (path, content) in entries {
            let mut header = tar::Header::new_old();
            let name = path.as_bytes();
            header.as_old_mut().name[..name.len()].copy_from_slice(name);
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_entry_type(tar::EntryType::Regular);
            header.set_cksum();
            builder
                .append(&header, content.as_bytes())
                .expect("append raw entry");
        }
        builder.finish().expect("finish raw tarball");
    }

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&tar_bytes).expect("gzip raw tarball");
    encoder.finish().expect("finish gzip")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fixture_artifact_name() {
        let fixture = CollectionFixture::new("acme", "widgets", "1.0.0");
        assert_eq!(fixture.artifact_filename(), "acme-widgets-1.0.0.tar.gz");
        assert_eq!(fixture.label(), "acme.widgets");
    }

    #[test]
    fn test_role_has_no_manifest() {
        let role = CollectionFixture::role("acme", "server", "0.4.0");
        let contents = role.contents();
        assert!(contents.contains_key("meta/main.yml"));
        assert!(!contents.contains_key("collection.toml"));
    }

    #[test]
    fn test_install_into_layout() {
        let tmp = TempDir::new().unwrap();
        let repo = CollectionFixture::new("acme", "widgets", "1.0.0").install_into(tmp.path());

        assert_eq!(repo, tmp.path().join("acme/widgets"));
        assert!(repo.join("collection.toml").exists());
        assert!(repo.join("meta/.install_info.toml").exists());
    }

    #[test]
    fn test_bytes_are_deterministic_enough_to_hash() {
        let fixture = CollectionFixture::new("acme", "widgets", "1.0.0");
        assert_eq!(fixture.sha256().len(), 64);
    }
}
