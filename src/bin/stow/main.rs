//! Stow CLI - install namespaced collections from registries, shelves,
//! SCM URLs and local archives

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use stowage::util::context::ContextOverrides;
use stowage::util::diagnostic::{self, Diagnostic};
use stowage::util::shell::ColorChoice;
use stowage::util::{GlobalContext, Shell};

mod cli;
mod commands;

use cli::{Cli, Commands};

/// Settings shared by every subcommand.
pub struct GlobalOptions {
    pub shell: Shell,
    pub overrides: ContextOverrides,
}

impl GlobalOptions {
    /// Build the context from the config file plus command-line overrides.
    pub fn context(&self) -> Result<GlobalContext> {
        GlobalContext::load(&self.overrides)
    }
}

fn main() {
    let cli = Cli::parse();
    let color = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };
    let shell = Shell::from_flags(cli.quiet, cli.verbose, color);
    let use_color = shell.use_color();

    match run(cli, shell) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            diagnostic::emit(&Diagnostic::from_error(&e), use_color);
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli, shell: Shell) -> Result<i32> {
    // Set up logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("stowage=debug")
        } else {
            EnvFilter::new("stowage=info")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let global_opts = GlobalOptions {
        shell,
        overrides: ContextOverrides {
            config_path: cli.config,
            server: cli.server,
            ignore_certs: cli.ignore_certs,
            content_path: cli.content_path,
        },
    };

    match cli.command {
        Commands::Install(args) => commands::install::execute(args, &global_opts),
        Commands::Download(args) => commands::download::execute(args, &global_opts),
        Commands::Remove(args) => commands::remove::execute(args, &global_opts),
        Commands::Info(args) => commands::info::execute(args, &global_opts),
        Commands::List(args) => commands::list::execute(args, &global_opts),
    }
}
