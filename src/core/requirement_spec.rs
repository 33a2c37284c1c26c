//! RequirementSpec - what the caller asked for.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::resolver::VersionConstraint;

/// How an artifact is located and retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMethod {
    /// Registry API lookup
    Registry,
    /// Version-control URL
    ScmUrl,
    /// Archive already on the local filesystem
    LocalFile,
    /// Archive at an arbitrary URL
    RemoteUrl,
    /// Static shelf mirror
    Shelf,
}

impl FetchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchMethod::Registry => "registry",
            FetchMethod::ScmUrl => "scm_url",
            FetchMethod::LocalFile => "local_file",
            FetchMethod::RemoteUrl => "remote_url",
            FetchMethod::Shelf => "shelf",
        }
    }
}

impl fmt::Display for FetchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FetchMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "registry" => Ok(FetchMethod::Registry),
            "scm_url" => Ok(FetchMethod::ScmUrl),
            "local_file" => Ok(FetchMethod::LocalFile),
            "remote_url" => Ok(FetchMethod::RemoteUrl),
            "shelf" => Ok(FetchMethod::Shelf),
            _ => Err(format!("unknown fetch method '{}'", s)),
        }
    }
}

/// A request for a collection: namespace, name, a version constraint, and
/// where to look for it.
///
/// Equality and hashing ignore the free-form source hint.
#[derive(Debug, Clone)]
pub struct RequirementSpec {
    namespace: String,
    name: String,
    version_constraint: VersionConstraint,
    fetch_method: FetchMethod,
    /// Path, URL or SCM location as written by the user.
    source: Option<String>,
    /// Branch, tag or commit for SCM requirements.
    scm_ref: Option<String>,
    /// Configured shelf name for shelf requirements.
    shelf: Option<String>,
}

impl RequirementSpec {
    /// Create a registry requirement accepting any version.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        RequirementSpec {
            namespace: namespace.into(),
            name: name.into(),
            version_constraint: VersionConstraint::any(),
            fetch_method: FetchMethod::Registry,
            source: None,
            scm_ref: None,
            shelf: None,
        }
    }

    pub fn with_constraint(mut self, constraint: VersionConstraint) -> Self {
        self.version_constraint = constraint;
        self
    }

    pub fn with_fetch_method(mut self, method: FetchMethod) -> Self {
        self.fetch_method = method;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_scm_ref(mut self, scm_ref: impl Into<String>) -> Self {
        self.scm_ref = Some(scm_ref.into());
        self
    }

    pub fn with_shelf(mut self, shelf: impl Into<String>) -> Self {
        self.shelf = Some(shelf.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version_constraint(&self) -> &VersionConstraint {
        &self.version_constraint
    }

    pub fn fetch_method(&self) -> FetchMethod {
        self.fetch_method
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn scm_ref(&self) -> Option<&str> {
        self.scm_ref.as_deref()
    }

    pub fn shelf(&self) -> Option<&str> {
        self.shelf.as_deref()
    }

    /// `namespace.name`
    pub fn label(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    /// Whether both identity segments are present.
    pub fn has_identity(&self) -> bool {
        !self.namespace.trim().is_empty() && !self.name.trim().is_empty()
    }
}

impl PartialEq for RequirementSpec {
    fn eq(&self, other: &Self) -> bool {
        self.namespace == other.namespace
            && self.name == other.name
            && self.version_constraint == other.version_constraint
            && self.fetch_method == other.fetch_method
            && self.scm_ref == other.scm_ref
            && self.shelf == other.shelf
    }
}

impl Eq for RequirementSpec {}

impl Hash for RequirementSpec {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.namespace.hash(state);
        self.name.hash(state);
        self.version_constraint.hash(state);
        self.fetch_method.hash(state);
        self.scm_ref.hash(state);
        self.shelf.hash(state);
    }
}

impl fmt::Display for RequirementSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())?;
        if !self.version_constraint.is_any() {
            write!(f, ",{}", self.version_constraint)?;
        }
        if let Some(scm_ref) = &self.scm_ref {
            write!(f, " ({})", scm_ref)?;
        }
        Ok(())
    }
}
