//! Predicate filters over installed repositories.

use std::collections::BTreeSet;

use crate::core::{InstalledRepository, RepositorySpec, RequirementSpec};

/// A filter applied by [`InstalledIndex::list`](super::InstalledIndex::list).
pub trait Matcher {
    fn matches(&self, installed: &InstalledRepository) -> bool;
}

impl<F> Matcher for F
where
    F: Fn(&InstalledRepository) -> bool,
{
    fn matches(&self, installed: &InstalledRepository) -> bool {
        self(installed)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MatchAll;

impl Matcher for MatchAll {
    fn matches(&self, _installed: &InstalledRepository) -> bool {
        true
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MatchNone;

impl Matcher for MatchNone {
    fn matches(&self, _installed: &InstalledRepository) -> bool {
        false
    }
}

/// Repositories in any of the given namespaces.
#[derive(Debug, Clone)]
pub struct MatchNamespaces {
    namespaces: BTreeSet<String>,
}

impl MatchNamespaces {
    pub fn new<I, S>(namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MatchNamespaces {
            namespaces: namespaces.into_iter().map(Into::into).collect(),
        }
    }
}

impl Matcher for MatchNamespaces {
    fn matches(&self, installed: &InstalledRepository) -> bool {
        self.namespaces.contains(installed.repository_spec.namespace())
    }
}

/// Repositories whose `namespace.name` is one of the given labels.
#[derive(Debug, Clone)]
pub struct MatchLabels {
    labels: BTreeSet<String>,
}

impl MatchLabels {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MatchLabels {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }
}

impl Matcher for MatchLabels {
    fn matches(&self, installed: &InstalledRepository) -> bool {
        self.labels.contains(&installed.label())
    }
}

/// Same namespace and name, with a version inside the constraint.
#[derive(Debug, Clone)]
pub struct MatchRequirementSpec<'a> {
    requirement_spec: &'a RequirementSpec,
}

impl<'a> MatchRequirementSpec<'a> {
    pub fn new(requirement_spec: &'a RequirementSpec) -> Self {
        MatchRequirementSpec { requirement_spec }
    }
}

impl Matcher for MatchRequirementSpec<'_> {
    fn matches(&self, installed: &InstalledRepository) -> bool {
        let repo = &installed.repository_spec;
        repo.namespace() == self.requirement_spec.namespace()
            && repo.name() == self.requirement_spec.name()
            && self
                .requirement_spec
                .version_constraint()
                .matches(repo.version())
    }
}

/// Exact namespace, name and version.
#[derive(Debug, Clone)]
pub struct MatchRepositorySpec<'a> {
    repository_spec: &'a RepositorySpec,
}

impl<'a> MatchRepositorySpec<'a> {
    pub fn new(repository_spec: &'a RepositorySpec) -> Self {
        MatchRepositorySpec { repository_spec }
    }
}

impl Matcher for MatchRepositorySpec<'_> {
    fn matches(&self, installed: &InstalledRepository) -> bool {
        installed.repository_spec == *self.repository_spec
    }
}

/// Each argument is a namespace (`acme`) or a label (`acme.widgets`).
#[derive(Debug, Clone)]
pub struct MatchNamespacesOrLabels {
    namespaces: MatchNamespaces,
    labels: MatchLabels,
}

impl MatchNamespacesOrLabels {
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let (labels, namespaces): (Vec<String>, Vec<String>) = items
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty())
            .partition(|s| s.contains('.'));

        MatchNamespacesOrLabels {
            namespaces: MatchNamespaces::new(namespaces),
            labels: MatchLabels::new(labels),
        }
    }
}

impl Matcher for MatchNamespacesOrLabels {
    fn matches(&self, installed: &InstalledRepository) -> bool {
        self.namespaces.matches(installed) || self.labels.matches(installed)
    }
}
