//! Implementation of `stow download`.
//!
//! Runs find and fetch for each spec and copies the artifact into an output
//! directory. Nothing is installed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use crate::core::{parse_requirement_spec, RepositorySpec, RequirementSpec};
use crate::ops::stow_install::{record_or_abort, validate_identity, Failure, Stage, EXIT_SOFTWARE};
use crate::sources::{DefaultFetcherFactory, Fetcher, FetcherFactory};
use crate::util::fs;
use crate::util::http::BlockingHttpClient;
use crate::util::shell::{Reporter, Status};
use crate::util::GlobalContext;

/// Options for `stow download`.
#[derive(Debug, Clone, Default)]
pub struct DownloadOptions {
    /// Directory the artifacts are copied into
    pub output_dir: PathBuf,
    pub ignore_errors: bool,
    pub namespace_override: Option<String>,
}

/// Outcome of a download run.
#[derive(Debug, Default)]
pub struct DownloadReport {
    /// Resolved repository and the path of its copied artifact
    pub downloaded: Vec<(RepositorySpec, PathBuf)>,
    pub failures: Vec<Failure>,
}

impl DownloadReport {
    pub fn exit_code(&self) -> i32 {
        if self.failures.is_empty() {
            0
        } else {
            EXIT_SOFTWARE
        }
    }
}

/// Download spec strings using the context's sources.
pub fn download(
    ctx: &GlobalContext,
    specs: &[String],
    opts: &DownloadOptions,
    reporter: &dyn Reporter,
) -> Result<DownloadReport> {
    let requirements = specs
        .iter()
        .map(|s| parse_requirement_spec(s, opts.namespace_override.as_deref()))
        .collect::<Result<Vec<_>>>()?;

    let http = Arc::new(BlockingHttpClient::new(ctx.ignore_certs())?);
    let factory = DefaultFetcherFactory::new(ctx, http);
    download_requirements(&requirements, &factory, opts, reporter)
}

/// Download already-parsed requirements through `factory`.
pub fn download_requirements(
    requirements: &[RequirementSpec],
    factory: &dyn FetcherFactory,
    opts: &DownloadOptions,
    reporter: &dyn Reporter,
) -> Result<DownloadReport> {
    for spec in requirements {
        validate_identity(spec)?;
    }
    fs::ensure_dir(&opts.output_dir)?;

    let mut report = DownloadReport::default();
    for spec in requirements {
        let label = spec.label();
        match download_one(spec, factory, &opts.output_dir, reporter) {
            Ok((repository_spec, path)) => {
                reporter.report(
                    Status::Downloaded,
                    &format!("{} to {}", repository_spec, path.display()),
                );
                report.downloaded.push((repository_spec, path));
            }
            Err((stage, error)) => record_or_abort(
                opts.ignore_errors,
                reporter,
                &mut report.failures,
                &label,
                stage,
                error,
            )?,
        }
    }

    Ok(report)
}

type StageResult<T> = std::result::Result<T, (Stage, anyhow::Error)>;

fn download_one(
    spec: &RequirementSpec,
    factory: &dyn FetcherFactory,
    output_dir: &Path,
    reporter: &dyn Reporter,
) -> StageResult<(RepositorySpec, PathBuf)> {
    let mut fetcher = factory.fetcher_for(spec).map_err(|e| (Stage::Find, e))?;
    let result = find_fetch_copy(fetcher.as_mut(), spec, output_dir, reporter);
    fetcher.cleanup();
    result
}

fn find_fetch_copy(
    fetcher: &mut dyn Fetcher,
    spec: &RequirementSpec,
    output_dir: &Path,
    reporter: &dyn Reporter,
) -> StageResult<(RepositorySpec, PathBuf)> {
    let find = fetcher.find(spec).map_err(|e| (Stage::Find, e))?;
    if find.deprecated {
        reporter.report(
            Status::Deprecated,
            &format!("{} has been deprecated", find.repository_spec.label()),
        );
    }

    reporter.report(Status::Fetching, &find.repository_spec.to_string());
    let fetched = fetcher
        .fetch(&find.repository_spec, &find)
        .map_err(|e| (Stage::Fetch, e))?;

    let copied = fs::copy_into(&fetched.artifact_path, output_dir).map_err(|e| (Stage::Fetch, e))?;
    Ok((find.repository_spec, copied))
}
