//! Implementation of `stow remove`.

use std::path::Path;

use anyhow::{bail, Result};

use crate::core::InstalledRepository;
use crate::installed::{InstalledIndex, MatchNamespacesOrLabels};
use crate::util::fs;
use crate::util::shell::{Reporter, Status};

/// Remove every installed repository matching `labels` (`namespace` or
/// `namespace.name`). Namespace directories left empty are removed too.
pub fn remove(
    content_root: &Path,
    labels: &[String],
    reporter: &dyn Reporter,
) -> Result<Vec<InstalledRepository>> {
    if labels.iter().all(|l| l.trim().is_empty()) {
        bail!("nothing to remove: give at least one namespace or namespace.name");
    }

    let index = InstalledIndex::new(content_root);
    let matched = index.list(&MatchNamespacesOrLabels::new(labels))?;

    if matched.is_empty() {
        reporter.warn(&format!(
            "no installed collections match {}",
            labels.join(", ")
        ));
        return Ok(matched);
    }

    for repo in &matched {
        fs::remove_dir_all_if_exists(&repo.path)?;
        reporter.report(
            Status::Removed,
            &format!("{} {}", repo.label(), repo.repository_spec.version()),
        );

        if let Some(namespace_dir) = repo.path.parent() {
            if fs::remove_dir_if_empty(namespace_dir)? {
                tracing::debug!("removed empty namespace {}", namespace_dir.display());
            }
        }
    }

    Ok(matched)
}
