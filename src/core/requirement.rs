//! Requirement - a node in the dependency expansion.

use std::collections::BTreeMap;
use std::fmt;

use anyhow::{Context, Result};

use super::repository_spec::RepositorySpec;
use super::requirement_spec::RequirementSpec;
use super::spec_parse::requirement_spec_from_dependency;

/// A requirement spec plus the repository that introduced it, if any.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Requirement {
    pub requirement_spec: RequirementSpec,
    /// `None` for requirements the user asked for directly.
    pub introduced_by: Option<RepositorySpec>,
}

impl Requirement {
    /// A requirement supplied by the user.
    pub fn top_level(requirement_spec: RequirementSpec) -> Self {
        Requirement {
            requirement_spec,
            introduced_by: None,
        }
    }

    /// A requirement declared by an installed repository.
    pub fn dependency(requirement_spec: RequirementSpec, introduced_by: RepositorySpec) -> Self {
        Requirement {
            requirement_spec,
            introduced_by: Some(introduced_by),
        }
    }

    pub fn is_top_level(&self) -> bool {
        self.introduced_by.is_none()
    }

    pub fn label(&self) -> String {
        self.requirement_spec.label()
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.introduced_by {
            Some(parent) => write!(f, "{} (required by {})", self.requirement_spec, parent),
            None => write!(f, "{}", self.requirement_spec),
        }
    }
}

/// Build requirements from a dependency map as declared in a manifest.
pub fn requirements_from_dependencies(
    dependencies: &BTreeMap<String, String>,
    introduced_by: &RepositorySpec,
) -> Result<Vec<Requirement>> {
    dependencies
        .iter()
        .map(|(label, constraint)| {
            let spec = requirement_spec_from_dependency(label, constraint)
                .with_context(|| format!("invalid dependency declared by {}", introduced_by))?;
            Ok(Requirement::dependency(spec, introduced_by.clone()))
        })
        .collect()
}
