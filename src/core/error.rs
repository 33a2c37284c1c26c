//! Error taxonomy for the install/resolve engine.
//!
//! Library functions return `anyhow::Result`; the variants here are the
//! classifiable failures the orchestrator inspects (via `downcast_ref`) to
//! decide between aborting the run and skipping a single requirement.

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// A classifiable install/resolve failure.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum StowError {
    #[error("invalid spec `{spec}`: {reason}")]
    #[diagnostic(code(stowage::spec::invalid))]
    InvalidSpec { spec: String, reason: String },

    #[error("`{spec}` does not name a namespace")]
    #[diagnostic(
        code(stowage::spec::missing_namespace),
        help("Use `namespace.name` or pass --namespace")
    )]
    MissingNamespace { spec: String },

    #[error("`{label}` was not found on {location}")]
    #[diagnostic(code(stowage::find::not_found))]
    NotFound { label: String, location: String },

    #[error("could not pick a single candidate for `{label}`: {reason}")]
    #[diagnostic(code(stowage::find::ambiguous))]
    Ambiguous { label: String, reason: String },

    #[error("failed to download {url}: {reason}")]
    #[diagnostic(
        code(stowage::fetch::download),
        help("Check your network connection and re-run the command")
    )]
    Download { url: String, reason: String },

    #[error("checksum mismatch for {artifact}")]
    #[diagnostic(
        code(stowage::fetch::checksum_mismatch),
        help("The artifact may be corrupt or tampered with; it was not installed")
    )]
    ChecksumMismatch {
        artifact: String,
        expected: String,
        actual: String,
    },

    #[error("failed to install `{label}`: {reason}")]
    #[diagnostic(code(stowage::install::failed))]
    Install { label: String, reason: String },

    #[error("`{label}` {version} was reported installed but could not be found afterwards")]
    #[diagnostic(code(stowage::install::verification))]
    InstallVerification { label: String, version: String },
}

impl StowError {
    /// Structural errors indicate a usage mistake and abort the run even
    /// when errors are being ignored.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            StowError::InvalidSpec { .. } | StowError::MissingNamespace { .. }
        )
    }

    /// Convert to a user-facing diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            StowError::ChecksumMismatch {
                artifact,
                expected,
                actual,
            } => Diagnostic::error(format!("checksum mismatch for {}", artifact))
                .with_context(format!("expected sha256: {}", expected))
                .with_context(format!("actual sha256:   {}", actual))
                .with_suggestion("Retry the download; report the artifact to its publisher if it persists"),

            StowError::MissingNamespace { spec } => {
                Diagnostic::error(format!("`{}` does not name a namespace", spec))
                    .with_suggestion(format!("Write it as `<namespace>.{}`", spec))
                    .with_suggestion("Pass --namespace <namespace>")
            }

            StowError::NotFound { .. } => {
                Diagnostic::error(self.to_string()).with_suggestion(suggestions::CHECK_SPELLING)
            }

            StowError::Download { .. } => {
                Diagnostic::error(self.to_string()).with_suggestion(suggestions::FETCH_FAILED)
            }

            StowError::Install { .. } => {
                Diagnostic::error(self.to_string()).with_suggestion(suggestions::FORCE_REINSTALL)
            }

            _ => Diagnostic::error(self.to_string()),
        }
    }
}
