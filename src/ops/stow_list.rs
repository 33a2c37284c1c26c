//! Implementation of `stow list`.

use std::path::Path;

use anyhow::Result;

use crate::core::InstalledRepository;
use crate::installed::{InstalledIndex, MatchAll, MatchNamespacesOrLabels, Matcher};

/// Installed repositories, optionally limited to namespaces or labels,
/// sorted by namespace then name.
pub fn list(content_root: &Path, filters: &[String]) -> Result<Vec<InstalledRepository>> {
    let index = InstalledIndex::new(content_root);

    let matcher: Box<dyn Matcher> = if filters.iter().all(|f| f.trim().is_empty()) {
        Box::new(MatchAll)
    } else {
        Box::new(MatchNamespacesOrLabels::new(filters))
    };

    index.list(matcher.as_ref())
}

/// One line per repository: `namespace.name  version  [role]`.
pub fn format_list(repos: &[InstalledRepository]) -> Vec<String> {
    let width = repos.iter().map(|r| r.label().len()).max().unwrap_or(0);
    repos
        .iter()
        .map(|r| {
            let kind = if r.is_role { "  (role)" } else { "" };
            format!(
                "{:<width$}  {}{}",
                r.label(),
                r.repository_spec.version(),
                kind,
                width = width
            )
        })
        .collect()
}
