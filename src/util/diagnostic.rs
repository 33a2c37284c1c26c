//! User-friendly diagnostic messages.
//!
//! Every error shown to the user carries the root cause, any relevant
//! context lines, and suggested next steps.

use std::fmt;

/// Common suggestion messages for consistent error handling.
pub mod suggestions {
    /// Suggestion when a collection is not found.
    pub const CHECK_SPELLING: &str =
        "help: Check the namespace and name, or run `stow info <spec>` to inspect it";

    /// Suggestion for fetch failures.
    pub const FETCH_FAILED: &str = "help: Check your network connection and try again";

    /// Suggestion when an install is refused because one already exists.
    pub const FORCE_REINSTALL: &str = "help: Re-run with --force to replace the installed copy";

    /// Suggestion when some requirements failed under --ignore-errors.
    pub const IGNORED_ERRORS: &str =
        "help: Re-run without --ignore-errors to stop at the first failure";
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A diagnostic message with optional suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Severity level
    pub severity: Severity,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity: Severity::Error,
            context: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    /// Create a new warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            ..Diagnostic::error(message)
        }
    }

    /// Build a diagnostic from an error chain.
    ///
    /// The outermost message becomes the headline and each cause becomes a
    /// context line.
    pub fn from_error(err: &anyhow::Error) -> Self {
        let mut diag = match err.downcast_ref::<crate::core::StowError>() {
            Some(kind) => kind.to_diagnostic(),
            None => Diagnostic::error(err.to_string()),
        };

        if diag.message != err.to_string() {
            diag.context.insert(0, err.to_string());
        }

        for cause in err.chain().skip(1) {
            let line = cause.to_string();
            if line != diag.message && !diag.context.contains(&line) {
                diag = diag.with_context(line);
            }
        }

        diag
    }

    /// Add context to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let severity_str = if color {
            match self.severity {
                Severity::Error => "\x1b[1;31merror\x1b[0m",
                Severity::Warning => "\x1b[1;33mwarning\x1b[0m",
            }
        } else {
            match self.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
            }
        };

        output.push_str(&format!("{}: {}\n", severity_str, self.message));

        for ctx in &self.context {
            output.push_str(&format!("  -> {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            output.push('\n');
            for suggestion in &self.suggestions {
                if suggestion.starts_with("help:") {
                    output.push_str(&format!("{}\n", suggestion));
                } else {
                    output.push_str(&format!("help: {}\n", suggestion));
                }
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}
