//! `stow install` command

use anyhow::Result;

use crate::cli::InstallArgs;
use crate::GlobalOptions;
use stowage::ops::{failure_summary, install, InstallOptions};
use stowage::util::diagnostic;

pub fn execute(args: InstallArgs, global_opts: &GlobalOptions) -> Result<i32> {
    let shell = &global_opts.shell;
    let ctx = global_opts.context()?;

    let opts = install_options(&args);
    tracing::debug!("installing into {}", ctx.content_root().display());

    let report = install(&ctx, &args.specs, &opts, shell)?;

    if let Some(summary) = failure_summary(&report.failures) {
        diagnostic::emit(&summary, shell.use_color());
    }

    Ok(report.exit_code())
}

fn install_options(args: &InstallArgs) -> InstallOptions {
    InstallOptions {
        ignore_errors: args.ignore_errors,
        no_deps: args.no_deps,
        force: args.force,
        namespace_override: args.namespace.clone(),
        jobs: args.jobs.max(1),
    }
}
