//! Version constraints backed by PubGrub ranges.
//!
//! A constraint is an AND of comparators. Comparators are separated by commas
//! or whitespace: `>=1.0.0,<2.0.0` and `>=1.0.0 <2.0.0` are the same range.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use pubgrub::Range;
use semver::Version;

use super::errors::ResolveError;

/// Characters that make up a comparison operator.
const OPERATOR_CHARS: &str = "=!<>^~";

/// A parsed version constraint such as `*`, `==1.2.3` or `>=1.0.0,<2.0.0`.
#[derive(Debug, Clone)]
pub struct VersionConstraint {
    text: String,
    range: Range<Version>,
}

impl VersionConstraint {
    /// The constraint that matches every version.
    pub fn any() -> Self {
        VersionConstraint {
            text: "*".to_string(),
            range: Range::full(),
        }
    }

    /// A constraint matching exactly one version.
    pub fn exact(version: &Version) -> Self {
        VersionConstraint {
            text: format!("=={}", version),
            range: Range::singleton(version.clone()),
        }
    }

    /// Parse a constraint string.
    pub fn parse(input: &str) -> Result<Self, ResolveError> {
        let text = input.trim();
        if text.is_empty() || text == "*" {
            return Ok(VersionConstraint::any());
        }

        let mut range = Range::full();
        for comparator in comparator_tokens(text)? {
            range = range.intersection(&comparator_to_range(text, &comparator)?);
        }

        Ok(VersionConstraint {
            text: text.to_string(),
            range,
        })
    }

    /// Whether this constraint accepts every version.
    pub fn is_any(&self) -> bool {
        self.text == "*"
    }

    /// Check a version against the constraint.
    pub fn matches(&self, version: &Version) -> bool {
        self.range.contains(version)
    }

    /// The constraint text as written.
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl Default for VersionConstraint {
    fn default() -> Self {
        VersionConstraint::any()
    }
}

impl PartialEq for VersionConstraint {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for VersionConstraint {}

impl Hash for VersionConstraint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.text.hash(state);
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

impl FromStr for VersionConstraint {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VersionConstraint::parse(s)
    }
}

/// Parse a version strictly, after dropping a leading `v`/`V`.
pub fn normalize_version(raw: &str) -> Result<Version, ResolveError> {
    let trimmed = raw.trim();
    let stripped = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);

    Version::parse(stripped).map_err(|e| ResolveError::InvalidVersion {
        version: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Split a constraint into `op+version` tokens, gluing detached operators
/// (`>= 1.0.0`) back onto their version.
fn comparator_tokens(text: &str) -> Result<Vec<String>, ResolveError> {
    let mut tokens = Vec::new();
    let mut pending_op: Option<&str> = None;

    for token in text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
    {
        if token.chars().all(|c| OPERATOR_CHARS.contains(c)) {
            if pending_op.is_some() {
                return Err(invalid(text, "two operators in a row"));
            }
            pending_op = Some(token);
            continue;
        }

        match pending_op.take() {
            Some(op) => tokens.push(format!("{}{}", op, token)),
            None => tokens.push(token.to_string()),
        }
    }

    if let Some(op) = pending_op {
        return Err(invalid(text, &format!("operator `{}` has no version", op)));
    }

    Ok(tokens)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Exact,
    NotEqual,
    Greater,
    GreaterEq,
    Less,
    LessEq,
    Caret,
    Tilde,
}

fn split_operator(token: &str) -> (Op, &str) {
    // Longest operators first so `>=` is not read as `>`.
    const OPS: &[(&str, Op)] = &[
        ("==", Op::Exact),
        ("!=", Op::NotEqual),
        (">=", Op::GreaterEq),
        ("<=", Op::LessEq),
        ("=", Op::Exact),
        (">", Op::Greater),
        ("<", Op::Less),
        ("^", Op::Caret),
        ("~", Op::Tilde),
    ];

    for (prefix, op) in OPS {
        if let Some(rest) = token.strip_prefix(prefix) {
            return (*op, rest);
        }
    }

    (Op::Exact, token)
}

/// Convert a single comparator token to a PubGrub range.
fn comparator_to_range(full: &str, token: &str) -> Result<Range<Version>, ResolveError> {
    let (op, version_text) = split_operator(token);
    let version_text = version_text
        .strip_prefix('v')
        .or_else(|| version_text.strip_prefix('V'))
        .unwrap_or(version_text);

    if version_text == "*" {
        return match op {
            Op::Exact => Ok(Range::full()),
            _ => Err(invalid(full, "`*` cannot follow an operator")),
        };
    }

    // `1.2.*` and `1.*` wildcards
    if let Some(prefix) = version_text.strip_suffix(".*") {
        if op != Op::Exact {
            return Err(invalid(full, "wildcards cannot follow an operator"));
        }
        let parts = parse_numeric_parts(full, prefix)?;
        let (lower, upper) = match parts.as_slice() {
            [major] => (Version::new(*major, 0, 0), Version::new(bump(full, *major)?, 0, 0)),
            [major, minor] => (
                Version::new(*major, *minor, 0),
                Version::new(*major, bump(full, *minor)?, 0),
            ),
            _ => return Err(invalid(full, "wildcard must follow a major or minor version")),
        };
        return Ok(Range::between(lower, upper));
    }

    let (version, explicit_minor) = parse_version_lenient(full, version_text)?;

    let range = match op {
        Op::Exact => Range::singleton(version),

        Op::NotEqual => Range::singleton(version).complement(),

        Op::Greater => Range::strictly_higher_than(version),

        Op::GreaterEq => Range::higher_than(version),

        Op::Less => Range::strictly_lower_than(version),

        Op::LessEq => Range::strictly_lower_than(version.clone()).union(&Range::singleton(version)),

        Op::Tilde => {
            // ~1.2.3 means >=1.2.3 <1.3.0, ~1 means >=1.0.0 <2.0.0
            let upper = if explicit_minor {
                Version::new(version.major, bump(full, version.minor)?, 0)
            } else {
                Version::new(bump(full, version.major)?, 0, 0)
            };
            Range::between(version, upper)
        }

        Op::Caret => {
            // ^1.2.3 means >=1.2.3 <2.0.0
            // ^0.2.3 means >=0.2.3 <0.3.0
            // ^0.0.3 means >=0.0.3 <0.0.4
            let upper = if version.major > 0 {
                Version::new(bump(full, version.major)?, 0, 0)
            } else if version.minor > 0 {
                Version::new(0, bump(full, version.minor)?, 0)
            } else {
                Version::new(0, 0, bump(full, version.patch)?)
            };
            Range::between(version, upper)
        }
    };

    Ok(range)
}

/// Next value of a version component, for exclusive upper bounds.
fn bump(full: &str, component: u64) -> Result<u64, ResolveError> {
    component
        .checked_add(1)
        .ok_or_else(|| invalid(full, "version component is too large"))
}

/// Parse a possibly incomplete version (`1`, `1.2`, `1.2.3`, `1.2.3-rc.1`).
///
/// Returns the version and whether a minor component was written.
fn parse_version_lenient(full: &str, text: &str) -> Result<(Version, bool), ResolveError> {
    if let Ok(version) = Version::parse(text) {
        return Ok((version, true));
    }

    let parts = parse_numeric_parts(full, text)?;
    match parts.as_slice() {
        [major] => Ok((Version::new(*major, 0, 0), false)),
        [major, minor] => Ok((Version::new(*major, *minor, 0), true)),
        _ => Err(invalid(full, &format!("`{}` is not a version", text))),
    }
}

fn parse_numeric_parts(full: &str, text: &str) -> Result<Vec<u64>, ResolveError> {
    text.split('.')
        .map(|part| {
            part.parse::<u64>()
                .map_err(|_| invalid(full, &format!("`{}` is not a version", text)))
        })
        .collect()
}

fn invalid(constraint: &str, reason: &str) -> ResolveError {
    ResolveError::InvalidConstraint {
        constraint: constraint.to_string(),
        reason: reason.to_string(),
    }
}
