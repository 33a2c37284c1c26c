//! `stow info` command

use anyhow::Result;

use crate::cli::InfoArgs;
use crate::GlobalOptions;
use stowage::ops::{format_entry, info};

pub fn execute(args: InfoArgs, global_opts: &GlobalOptions) -> Result<i32> {
    let shell = &global_opts.shell;
    let ctx = global_opts.context()?;

    let report = info(&ctx, &args.specs, args.offline)?;

    for (i, entry) in report.entries.iter().enumerate() {
        if i > 0 {
            shell.print_line("");
        }
        shell.print_line(format_entry(entry).trim_end());
    }

    Ok(report.exit_code())
}
