//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Stow - install namespaced collections and their dependencies
#[derive(Parser)]
#[command(name = "stow")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Config file to use instead of ~/.stowage/config.toml
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Registry server URL
    #[arg(long, global = true, env = "STOWAGE_SERVER", value_name = "URL")]
    pub server: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    pub ignore_certs: bool,

    /// Root of the installed collections tree
    #[arg(long, global = true, env = "STOWAGE_CONTENT_PATH", value_name = "DIR")]
    pub content_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Install collections and their dependencies
    Install(InstallArgs),

    /// Download collection artifacts without installing them
    Download(DownloadArgs),

    /// Remove installed collections
    Remove(RemoveArgs),

    /// Show installed and remote details for collections
    Info(InfoArgs),

    /// List installed collections
    List(ListArgs),
}

#[derive(Args)]
pub struct InstallArgs {
    /// Requirement specs, e.g. `acme.widgets`, `acme.widgets,>=1.0.0`,
    /// `./acme-widgets-1.0.0.tar.gz` or `git+https://host/repo.git`
    #[arg(required = true)]
    pub specs: Vec<String>,

    /// Record failures and keep going instead of aborting
    #[arg(long)]
    pub ignore_errors: bool,

    /// Do not install dependencies
    #[arg(long)]
    pub no_deps: bool,

    /// Reinstall collections that are already installed
    #[arg(short, long)]
    pub force: bool,

    /// Namespace to use for every spec given on the command line
    #[arg(long, value_name = "NS")]
    pub namespace: Option<String>,

    /// Number of requirements to find and fetch in parallel
    #[arg(short, long, default_value_t = 1, value_name = "N")]
    pub jobs: usize,
}

#[derive(Args)]
pub struct DownloadArgs {
    /// Requirement specs to download
    #[arg(required = true)]
    pub specs: Vec<String>,

    /// Directory to write artifacts into
    #[arg(long, default_value = ".", value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Record failures and keep going instead of aborting
    #[arg(long)]
    pub ignore_errors: bool,

    /// Namespace to use for every spec given on the command line
    #[arg(long, value_name = "NS")]
    pub namespace: Option<String>,
}

#[derive(Args)]
pub struct RemoveArgs {
    /// Labels (`namespace.name`) of the collections to remove
    #[arg(required = true)]
    pub labels: Vec<String>,
}

#[derive(Args)]
pub struct InfoArgs {
    /// Requirement specs to describe
    #[arg(required = true)]
    pub specs: Vec<String>,

    /// Only report what is installed locally
    #[arg(long)]
    pub offline: bool,
}

#[derive(Args)]
pub struct ListArgs {
    /// Namespaces or labels to limit the listing to
    pub filters: Vec<String>,
}
