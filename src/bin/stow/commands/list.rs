//! `stow list` command

use anyhow::Result;

use crate::cli::ListArgs;
use crate::GlobalOptions;
use stowage::ops::{format_list, list};

pub fn execute(args: ListArgs, global_opts: &GlobalOptions) -> Result<i32> {
    let shell = &global_opts.shell;
    let ctx = global_opts.context()?;

    let repos = list(ctx.content_root(), &args.filters)?;
    if repos.is_empty() {
        shell.note(format!("no collections installed in {}", ctx.content_root().display()));
        return Ok(0);
    }

    for line in format_list(&repos) {
        shell.print_line(line);
    }

    Ok(0)
}
