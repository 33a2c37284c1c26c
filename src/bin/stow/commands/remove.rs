//! `stow remove` command

use anyhow::Result;

use crate::cli::RemoveArgs;
use crate::GlobalOptions;
use stowage::ops::remove;

pub fn execute(args: RemoveArgs, global_opts: &GlobalOptions) -> Result<i32> {
    let ctx = global_opts.context()?;

    let removed = remove(ctx.content_root(), &args.labels, &global_opts.shell)?;
    tracing::debug!("removed {} collection(s)", removed.len());

    Ok(0)
}
