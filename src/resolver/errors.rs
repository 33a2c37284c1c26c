//! Version resolution error types and diagnostics.

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::util::diagnostic::Diagnostic;

/// Error during version selection.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum ResolveError {
    #[error("no versions are available for `{label}`")]
    #[diagnostic(code(stowage::resolve::no_versions))]
    NoVersionsAvailable { label: String },

    #[error("no version of `{label}` matches `{constraint}`")]
    #[diagnostic(code(stowage::resolve::no_match))]
    NoMatchingVersion {
        label: String,
        constraint: String,
        available: Vec<String>,
    },

    #[error("versions `{first}` and `{second}` of `{label}` both normalize to {version}")]
    #[diagnostic(code(stowage::resolve::ambiguous))]
    AmbiguousVersions {
        label: String,
        version: String,
        first: String,
        second: String,
    },

    #[error("invalid version constraint `{constraint}`: {reason}")]
    #[diagnostic(code(stowage::resolve::invalid_constraint))]
    InvalidConstraint { constraint: String, reason: String },

    #[error("invalid version `{version}`: {reason}")]
    #[diagnostic(code(stowage::resolve::invalid_version))]
    InvalidVersion { version: String, reason: String },
}

impl ResolveError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ResolveError::NoMatchingVersion {
                label,
                constraint,
                available,
            } => {
                let mut diag = Diagnostic::error(format!(
                    "no version of `{}` matches `{}`",
                    label, constraint
                ));

                if !available.is_empty() {
                    diag = diag.with_context(format!(
                        "available versions: {}",
                        available.join(", ")
                    ));
                }

                diag.with_suggestion(format!("Relax the version constraint for `{}`", label))
            }

            ResolveError::AmbiguousVersions { label, .. } => Diagnostic::error(self.to_string())
                .with_suggestion(format!(
                    "Ask the publisher of `{}` to remove the duplicate version",
                    label
                )),

            _ => Diagnostic::error(self.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_match_diagnostic_lists_versions() {
        let err = ResolveError::NoMatchingVersion {
            label: "acme.widgets".into(),
            constraint: ">=3.0.0".into(),
            available: vec!["1.0.0".into(), "2.0.0".into()],
        };

        let output = err.to_diagnostic().format(false);
        assert!(output.contains("no version of `acme.widgets` matches `>=3.0.0`"));
        assert!(output.contains("available versions: 1.0.0, 2.0.0"));
    }
}
