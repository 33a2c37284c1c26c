//! Version selection.
//!
//! Given the versions a source says exist and a constraint, pick the single
//! highest version that satisfies the constraint.

pub mod errors;
pub mod version;

use std::collections::BTreeMap;

use semver::Version;

pub use errors::ResolveError;
pub use version::{normalize_version, VersionConstraint};

/// Select the best candidate for `constraint`.
///
/// Candidates that are not strict semantic versions are skipped with a
/// warning. Two distinct strings normalizing to the same version (`v1.0.0`
/// and `1.0.0`) are an error. Returns the raw candidate string as given.
pub fn select_version<I, S>(
    label: &str,
    constraint: &VersionConstraint,
    candidates: I,
) -> Result<String, ResolveError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let valid = parse_candidates(label, candidates)?;

    if valid.is_empty() {
        return Err(ResolveError::NoVersionsAvailable {
            label: label.to_string(),
        });
    }

    let best = valid
        .iter()
        .rev()
        .find(|(version, _)| constraint.matches(version))
        .map(|(_, raw)| raw.clone());

    match best {
        Some(raw) => {
            tracing::debug!("selected {} {} for `{}`", label, raw, constraint);
            Ok(raw)
        }
        None => Err(ResolveError::NoMatchingVersion {
            label: label.to_string(),
            constraint: constraint.to_string(),
            available: valid.values().rev().cloned().collect(),
        }),
    }
}

/// Parse and deduplicate candidates, keyed by normalized version.
fn parse_candidates<I, S>(label: &str, candidates: I) -> Result<BTreeMap<Version, String>, ResolveError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut valid: BTreeMap<Version, String> = BTreeMap::new();

    for candidate in candidates {
        let raw = candidate.as_ref();
        let version = match normalize_version(raw) {
            Ok(version) => version,
            Err(e) => {
                tracing::warn!("skipping version of `{}`: {}", label, e);
                continue;
            }
        };

        match valid.get(&version) {
            Some(existing) if existing != raw => {
                return Err(ResolveError::AmbiguousVersions {
                    label: label.to_string(),
                    version: version.to_string(),
                    first: existing.clone(),
                    second: raw.to_string(),
                });
            }
            Some(_) => {}
            None => {
                valid.insert(version, raw.to_string());
            }
        }
    }

    Ok(valid)
}
