//! `stow download` command

use anyhow::Result;

use crate::cli::DownloadArgs;
use crate::GlobalOptions;
use stowage::ops::{download, failure_summary, DownloadOptions};
use stowage::util::{diagnostic, Status};

pub fn execute(args: DownloadArgs, global_opts: &GlobalOptions) -> Result<i32> {
    let shell = &global_opts.shell;
    let ctx = global_opts.context()?;

    let opts = DownloadOptions {
        output_dir: args.output_dir,
        ignore_errors: args.ignore_errors,
        namespace_override: args.namespace,
    };

    let report = download(&ctx, &args.specs, &opts, shell)?;

    shell.status(
        Status::Finished,
        format!(
            "{} artifact(s) written to {}",
            report.downloaded.len(),
            opts.output_dir.display()
        ),
    );

    if let Some(summary) = failure_summary(&report.failures) {
        diagnostic::emit(&summary, shell.use_color());
    }

    Ok(report.exit_code())
}
