//! Implementation of `stow install`.
//!
//! The install loop runs passes until no new requirements appear:
//!
//! 1. Filter out requirements an installed repository already satisfies.
//! 2. Find and fetch the rest (in parallel with `jobs > 1`).
//! 3. Install each artifact, confirm it through the index, clean up.
//! 4. Discover the installed repositories' unmet dependencies; they form
//!    the next pass.
//!
//! Each requirement spec is processed at most once per run, so cyclic and
//! diamond-shaped dependency graphs terminate.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::archive::{ArchiveInstaller, InstallExecutor};
use crate::core::{
    parse_requirement_spec, InstalledRepository, Requirement, RequirementSpec, StowError,
};
use crate::installed::InstalledIndex;
use crate::sources::{DefaultFetcherFactory, FetchResult, Fetcher, FetcherFactory, FindResult};
use crate::util::http::BlockingHttpClient;
use crate::util::diagnostic::{suggestions, Diagnostic};
use crate::util::shell::{Reporter, Status};
use crate::util::GlobalContext;

/// Process exit status for a run that accumulated failures.
pub const EXIT_SOFTWARE: i32 = 70;

/// Options for `stow install`.
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Record per-requirement failures and continue instead of aborting
    pub ignore_errors: bool,

    /// Install only the requested collections
    pub no_deps: bool,

    /// Reinstall even when the requirement is already satisfied
    pub force: bool,

    /// Namespace for every user-supplied spec
    pub namespace_override: Option<String>,

    /// Parallel find/fetch workers
    pub jobs: usize,
}

impl Default for InstallOptions {
    fn default() -> Self {
        InstallOptions {
            ignore_errors: false,
            no_deps: false,
            force: false,
            namespace_override: None,
            jobs: 1,
        }
    }
}

/// Where in the pipeline a requirement failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Find,
    Fetch,
    Install,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Find => "find",
            Stage::Fetch => "fetch",
            Stage::Install => "install",
        })
    }
}

/// A per-requirement failure recorded under `ignore_errors`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub label: String,
    pub stage: Stage,
    pub message: String,
}

/// A requirement dropped at the filter step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub requirement: Requirement,
    pub reason: String,
}

/// Outcome of an install run.
#[derive(Debug, Default)]
pub struct InstallReport {
    /// Installed repositories, in install order
    pub installed: Vec<InstalledRepository>,

    /// Requirements that were already satisfied or blocked by another version
    pub skipped: Vec<Skipped>,

    /// Dependencies added to the working set, in discovery order
    pub discovered: Vec<Requirement>,

    pub failures: Vec<Failure>,
}

impl InstallReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// `0`, or [`EXIT_SOFTWARE`] when any failure was recorded.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            EXIT_SOFTWARE
        }
    }
}

/// A warning listing the failures recorded under `ignore_errors`, if any.
pub fn failure_summary(failures: &[Failure]) -> Option<Diagnostic> {
    if failures.is_empty() {
        return None;
    }

    let diagnostic = failures.iter().fold(
        Diagnostic::warning(format!("{} requirement(s) failed", failures.len())),
        |diag, failure| diag.with_context(format!("{} ({}): {}", failure.label, failure.stage, failure.message)),
    );
    Some(diagnostic.with_suggestion(suggestions::IGNORED_ERRORS))
}

/// Classify an error as fatal for the run (`Err`) or record it (`Ok`).
///
/// Structural errors abort regardless of `ignore_errors`.
pub(crate) fn record_or_abort(
    ignore_errors: bool,
    reporter: &dyn Reporter,
    failures: &mut Vec<Failure>,
    label: &str,
    stage: Stage,
    error: anyhow::Error,
) -> Result<()> {
    let structural = error
        .downcast_ref::<StowError>()
        .map(StowError::is_structural)
        .unwrap_or(false);

    if structural || !ignore_errors {
        return Err(error.context(format!("failed to {} `{}`", stage, label)));
    }

    let message = format!("{:#}", error);
    tracing::warn!("{} failed for {}: {}", stage, label, message);
    reporter.report(Status::Error, &format!("failed to {} {}: {}", stage, label, message));
    failures.push(Failure {
        label: label.to_string(),
        stage,
        message,
    });
    Ok(())
}

/// Reject requirements without both identity segments.
pub(crate) fn validate_identity(spec: &RequirementSpec) -> Result<()> {
    if spec.namespace().trim().is_empty() {
        return Err(StowError::MissingNamespace {
            spec: spec.to_string().trim_start_matches('.').to_string(),
        }
        .into());
    }
    if spec.name().trim().is_empty() {
        return Err(StowError::InvalidSpec {
            spec: spec.to_string(),
            reason: "no collection name".to_string(),
        }
        .into());
    }
    Ok(())
}

/// Install spec strings into the context's content root.
pub fn install(
    ctx: &GlobalContext,
    specs: &[String],
    opts: &InstallOptions,
    reporter: &dyn Reporter,
) -> Result<InstallReport> {
    let requirements = specs
        .iter()
        .map(|s| {
            parse_requirement_spec(s, opts.namespace_override.as_deref()).map(Requirement::top_level)
        })
        .collect::<Result<Vec<_>>>()?;

    let http = Arc::new(BlockingHttpClient::new(ctx.ignore_certs())?);
    let factory = DefaultFetcherFactory::new(ctx, http);
    let executor = ArchiveInstaller::new();

    Installer::new(ctx.content_root(), &factory, &executor, reporter, opts).run(requirements)
}

/// The install loop, with its collaborators injected.
pub struct Installer<'a> {
    content_root: PathBuf,
    index: InstalledIndex,
    factory: &'a dyn FetcherFactory,
    executor: &'a dyn InstallExecutor,
    reporter: &'a dyn Reporter,
    opts: &'a InstallOptions,
}

/// Find and fetch output for one requirement.
struct Fetched {
    find: FindResult,
    fetch: FetchResult,
}

/// One requirement's trip through find and fetch.
struct Attempt {
    requirement: Requirement,
    fetcher: Option<Box<dyn Fetcher>>,
    outcome: std::result::Result<Fetched, (Stage, anyhow::Error)>,
}

impl Attempt {
    fn cleanup(&mut self) {
        if let Some(fetcher) = self.fetcher.as_mut() {
            fetcher.cleanup();
        }
    }
}

impl<'a> Installer<'a> {
    pub fn new(
        content_root: &Path,
        factory: &'a dyn FetcherFactory,
        executor: &'a dyn InstallExecutor,
        reporter: &'a dyn Reporter,
        opts: &'a InstallOptions,
    ) -> Self {
        Installer {
            content_root: content_root.to_path_buf(),
            index: InstalledIndex::new(content_root),
            factory,
            executor,
            reporter,
            opts,
        }
    }

    /// Drive `requirements` and their dependencies to a fixed point.
    pub fn run(&self, requirements: Vec<Requirement>) -> Result<InstallReport> {
        let mut report = InstallReport::default();
        let mut seen: HashSet<RequirementSpec> = HashSet::new();

        let mut pending = Vec::new();
        for requirement in requirements {
            let requirement = self.apply_namespace_override(requirement);
            validate_identity(&requirement.requirement_spec)?;
            if seen.insert(requirement.requirement_spec.clone()) {
                pending.push(requirement);
            }
        }

        let mut pass = 0;
        while !pending.is_empty() {
            pass += 1;
            tracing::debug!("pass {}: {} requirement(s)", pass, pending.len());

            let (batch, deferred) = split_by_label(self.filter(pending, &mut report)?);
            let attempts = self.find_and_fetch_all(batch)?;
            let installed = self.install_all(attempts, &mut report)?;

            pending = deferred;
            if self.opts.no_deps {
                self.warn_unmet(&installed)?;
                continue;
            }

            for requirement in self.discover(&installed, &mut seen)? {
                report.discovered.push(requirement.clone());
                pending.push(requirement);
            }
        }

        if pass > 0 {
            self.reporter.report(
                Status::Finished,
                &format!(
                    "{} installed, {} skipped, {} failed",
                    report.installed.len(),
                    report.skipped.len(),
                    report.failures.len()
                ),
            );
        }
        Ok(report)
    }

    fn apply_namespace_override(&self, requirement: Requirement) -> Requirement {
        match (&self.opts.namespace_override, requirement.is_top_level()) {
            (Some(ns), true) if !ns.trim().is_empty() => Requirement::top_level(
                requirement.requirement_spec.with_namespace(ns.trim()),
            ),
            _ => requirement,
        }
    }

    // ========================================================================
    // Filter
    // ========================================================================

    fn filter(&self, pending: Vec<Requirement>, report: &mut InstallReport) -> Result<Vec<Requirement>> {
        if self.opts.force {
            return Ok(pending);
        }

        let mut keep = Vec::new();
        for requirement in pending {
            let spec = &requirement.requirement_spec;

            if let Some(existing) = self.index.find_by_requirement_spec(spec)?.first() {
                let reason = format!(
                    "{} {} is already installed",
                    existing.label(),
                    existing.repository_spec.version()
                );
                self.reporter.report(Status::Skipped, &reason);
                report.skipped.push(Skipped { requirement, reason });
                continue;
            }

            if let Some(other) = self.index.find_by_label(spec.namespace(), spec.name())?.first() {
                let reason = format!(
                    "{} {} is installed but {} was requested; use --force to replace it",
                    other.label(),
                    other.repository_spec.version(),
                    spec.version_constraint()
                );
                self.reporter.warn(&reason);
                report.skipped.push(Skipped { requirement, reason });
                continue;
            }

            keep.push(requirement);
        }
        Ok(keep)
    }

    // ========================================================================
    // Find + fetch
    // ========================================================================

    fn find_and_fetch_all(&self, batch: Vec<Requirement>) -> Result<Vec<Attempt>> {
        if self.opts.jobs <= 1 || batch.len() <= 1 {
            return Ok(batch.into_iter().map(|r| self.find_and_fetch(r)).collect());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.opts.jobs)
            .build()
            .context("failed to start fetch workers")?;

        Ok(pool.install(|| {
            batch
                .into_par_iter()
                .map(|r| self.find_and_fetch(r))
                .collect()
        }))
    }

    fn find_and_fetch(&self, requirement: Requirement) -> Attempt {
        let spec = requirement.requirement_spec.clone();

        let mut fetcher = match self.factory.fetcher_for(&spec) {
            Ok(fetcher) => fetcher,
            Err(e) => {
                return Attempt {
                    requirement,
                    fetcher: None,
                    outcome: Err((Stage::Find, e)),
                }
            }
        };

        self.reporter.report(Status::Resolving, &requirement.to_string());
        let outcome = self.find(fetcher.as_mut(), &requirement).and_then(|find| {
            self.reporter
                .report(Status::Fetching, &find.repository_spec.to_string());
            fetcher
                .fetch(&find.repository_spec, &find)
                .map(|fetch| Fetched { find, fetch })
                .map_err(|e| (Stage::Fetch, e))
        });

        Attempt {
            requirement,
            fetcher: Some(fetcher),
            outcome,
        }
    }

    fn find(
        &self,
        fetcher: &mut dyn Fetcher,
        requirement: &Requirement,
    ) -> std::result::Result<FindResult, (Stage, anyhow::Error)> {
        let mut find = fetcher
            .find(&requirement.requirement_spec)
            .map_err(|e| (Stage::Find, e))?;

        // An explicit namespace wins over server-side aliasing.
        if requirement.is_top_level() {
            if let Some(ns) = self.opts.namespace_override.as_deref().filter(|ns| !ns.trim().is_empty()) {
                if find.repository_spec.namespace() != ns.trim() {
                    find.repository_spec = find.repository_spec.with_namespace(ns.trim());
                }
            }
        }

        tracing::debug!("{} resolved to {}", requirement, find.repository_spec);
        if find.deprecated {
            self.reporter.report(
                Status::Deprecated,
                &format!(
                    "{} has been deprecated and may be removed in a future release",
                    find.repository_spec.label()
                ),
            );
        }
        Ok(find)
    }

    // ========================================================================
    // Install
    // ========================================================================

    fn install_all(&self, mut attempts: Vec<Attempt>, report: &mut InstallReport) -> Result<Vec<InstalledRepository>> {
        let result = self.install_attempts(&mut attempts, report);
        for attempt in attempts.iter_mut() {
            attempt.cleanup();
        }
        result
    }

    fn install_attempts(&self, attempts: &mut [Attempt], report: &mut InstallReport) -> Result<Vec<InstalledRepository>> {
        let mut installed = Vec::new();

        for attempt in attempts.iter_mut() {
            let label = attempt.requirement.label();
            let outcome = std::mem::replace(
                &mut attempt.outcome,
                Err((Stage::Install, anyhow::anyhow!("already processed"))),
            );

            let result = outcome.and_then(|fetched| {
                self.install_one(&fetched).map_err(|e| (Stage::Install, e))
            });
            attempt.cleanup();

            match result {
                Ok(repo) => {
                    report.installed.push(repo.clone());
                    installed.push(repo);
                }
                Err((stage, error)) => record_or_abort(
                    self.opts.ignore_errors,
                    self.reporter,
                    &mut report.failures,
                    &label,
                    stage,
                    error,
                )?,
            }
        }

        Ok(installed)
    }

    fn install_one(&self, fetched: &Fetched) -> Result<InstalledRepository> {
        let repository_spec = &fetched.find.repository_spec;
        self.reporter.report(Status::Installing, &repository_spec.to_string());

        let files = self
            .executor
            .install(
                repository_spec,
                &fetched.fetch.artifact_path,
                &self.content_root,
                self.opts.force,
            )
            .map_err(|e| match e.downcast_ref::<StowError>() {
                Some(_) => e,
                None => StowError::Install {
                    label: repository_spec.label(),
                    reason: format!("{:#}", e),
                }
                .into(),
            })?;

        let record = self
            .index
            .find_by_repository_spec(repository_spec)?
            .into_iter()
            .next()
            .ok_or_else(|| StowError::InstallVerification {
                label: repository_spec.label(),
                version: repository_spec.version().to_string(),
            })?;

        self.reporter.report(
            Status::Installed,
            &format!(
                "{} {} to {} ({} files)",
                record.label(),
                record.repository_spec.version(),
                record.path.display(),
                files.len()
            ),
        );
        Ok(record)
    }

    // ========================================================================
    // Discover
    // ========================================================================

    fn discover(
        &self,
        installed: &[InstalledRepository],
        seen: &mut HashSet<RequirementSpec>,
    ) -> Result<Vec<Requirement>> {
        let mut next = Vec::new();

        for repo in installed {
            for dependency in &repo.requirements {
                let spec = &dependency.requirement_spec;
                if seen.contains(spec) {
                    continue;
                }
                if !self.index.find_by_requirement_spec(spec)?.is_empty() {
                    tracing::debug!("{} already satisfied", dependency);
                    continue;
                }

                validate_identity(spec)?;
                seen.insert(spec.clone());
                self.reporter.report(
                    Status::Info,
                    &format!("{} requires {}, adding it", repo.repository_spec, spec),
                );
                next.push(dependency.clone());
            }
        }

        Ok(next)
    }

    fn warn_unmet(&self, installed: &[InstalledRepository]) -> Result<()> {
        for repo in installed {
            for dependency in &repo.requirements {
                if self
                    .index
                    .find_by_requirement_spec(&dependency.requirement_spec)?
                    .is_empty()
                {
                    self.reporter.warn(&format!(
                        "{} requires {} which is not installed",
                        repo.repository_spec, dependency.requirement_spec
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Keep the first requirement per `namespace.name`; the rest wait for the
/// next pass so no two requirements of a pass install into the same directory.
fn split_by_label(requirements: Vec<Requirement>) -> (Vec<Requirement>, Vec<Requirement>) {
    let mut labels = HashSet::new();
    requirements
        .into_iter()
        .partition(|r| labels.insert(r.label()))
}
