//! Implementation of `stow info`.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use crate::core::{parse_requirement_spec, InstalledRepository, RequirementSpec, StowError};
use crate::installed::InstalledIndex;
use crate::ops::stow_install::{validate_identity, EXIT_SOFTWARE};
use crate::sources::{DefaultFetcherFactory, FetcherFactory, FindResult};
use crate::util::http::BlockingHttpClient;
use crate::util::GlobalContext;

/// What is known about one spec, locally and remotely.
#[derive(Debug)]
pub struct InfoEntry {
    pub requirement_spec: RequirementSpec,
    pub installed: Vec<InstalledRepository>,
    /// `None` when offline or when the lookup failed
    pub remote: Option<FindResult>,
    pub remote_error: Option<String>,
}

/// Outcome of `stow info`.
#[derive(Debug, Default)]
pub struct InfoReport {
    pub entries: Vec<InfoEntry>,
}

impl InfoReport {
    pub fn exit_code(&self) -> i32 {
        if self.entries.iter().any(|e| e.remote_error.is_some()) {
            EXIT_SOFTWARE
        } else {
            0
        }
    }
}

/// Describe spec strings. Remote lookups are skipped when `offline`.
pub fn info(ctx: &GlobalContext, specs: &[String], offline: bool) -> Result<InfoReport> {
    let requirements = specs
        .iter()
        .map(|s| parse_requirement_spec(s, None))
        .collect::<Result<Vec<_>>>()?;

    let factory = if offline {
        None
    } else {
        let http = Arc::new(BlockingHttpClient::new(ctx.ignore_certs())?);
        Some(DefaultFetcherFactory::new(ctx, http))
    };

    info_requirements(
        ctx.content_root(),
        &requirements,
        factory.as_ref().map(|f| f as &dyn FetcherFactory),
    )
}

/// Describe parsed requirements. `factory` of `None` means offline.
pub fn info_requirements(
    content_root: &Path,
    requirements: &[RequirementSpec],
    factory: Option<&dyn FetcherFactory>,
) -> Result<InfoReport> {
    let index = InstalledIndex::new(content_root);
    let mut report = InfoReport::default();

    for spec in requirements {
        validate_identity(spec)?;
        let installed = index.find_by_label(spec.namespace(), spec.name())?;

        let (remote, remote_error) = match factory {
            None => (None, None),
            Some(factory) => match lookup(factory, spec) {
                Ok(found) => (Some(found), None),
                Err(e) => {
                    if e.downcast_ref::<StowError>().map(StowError::is_structural).unwrap_or(false) {
                        return Err(e);
                    }
                    tracing::debug!("remote lookup for {} failed: {:#}", spec, e);
                    (None, Some(format!("{:#}", e)))
                }
            },
        };

        report.entries.push(InfoEntry {
            requirement_spec: spec.clone(),
            installed,
            remote,
            remote_error,
        });
    }

    Ok(report)
}

fn lookup(factory: &dyn FetcherFactory, spec: &RequirementSpec) -> Result<FindResult> {
    let mut fetcher = factory.fetcher_for(spec)?;
    let found = fetcher.find(spec);
    fetcher.cleanup();
    found
}

/// Render one entry for the terminal.
pub fn format_entry(entry: &InfoEntry) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", entry.requirement_spec.label());

    if entry.installed.is_empty() {
        let _ = writeln!(out, "  installed:    no");
    }
    for repo in &entry.installed {
        let _ = writeln!(out, "  installed:    {}", repo.repository_spec.version());
        let _ = writeln!(out, "  path:         {}", repo.path.display());
        let _ = writeln!(out, "  install date: {}", repo.install_info.install_date);
        for req in &repo.requirements {
            let _ = writeln!(
                out,
                "  requires:     {} {}",
                req.label(),
                req.requirement_spec.version_constraint()
            );
        }
    }

    if let Some(found) = &entry.remote {
        let _ = writeln!(out, "  latest:       {}", found.repository_spec.version());
        if found.deprecated {
            let _ = writeln!(out, "  deprecated:   yes");
        }
        let _ = writeln!(out, "  source:       {}", found.artifact.location);
        for (label, constraint) in &found.dependencies {
            let _ = writeln!(out, "  depends on:   {} {}", label, constraint);
        }
    }
    if let Some(error) = &entry.remote_error {
        let _ = writeln!(out, "  remote:       {}", error);
    }

    out
}
