//! RepositorySpec - one concrete, resolved version of a collection.

use std::fmt;
use std::hash::{Hash, Hasher};

use semver::Version;

use super::requirement_spec::FetchMethod;

/// A resolved `namespace.name` at one exact version.
///
/// Equality and hashing cover namespace, name and version only; this is the
/// key for installed-state lookups.
#[derive(Debug, Clone)]
pub struct RepositorySpec {
    namespace: String,
    name: String,
    version: Version,
    fetch_method: FetchMethod,
}

impl RepositorySpec {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        version: Version,
        fetch_method: FetchMethod,
    ) -> Self {
        RepositorySpec {
            namespace: namespace.into(),
            name: name.into(),
            version,
            fetch_method,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn fetch_method(&self) -> FetchMethod {
        self.fetch_method
    }

    /// `namespace.name`
    pub fn label(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    /// Conventional artifact file name: `namespace-name-version.tar.gz`.
    pub fn artifact_filename(&self) -> String {
        format!("{}-{}-{}.tar.gz", self.namespace, self.name, self.version)
    }

    /// Same spec under a different namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }
}

impl PartialEq for RepositorySpec {
    fn eq(&self, other: &Self) -> bool {
        self.namespace == other.namespace && self.name == other.name && self.version == other.version
    }
}

impl Eq for RepositorySpec {}

impl Hash for RepositorySpec {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.namespace.hash(state);
        self.name.hash(state);
        self.version.hash(state);
    }
}

impl fmt::Display for RepositorySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{},{}", self.namespace, self.name, self.version)
    }
}
