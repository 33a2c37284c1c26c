//! High-level operations.
//!
//! This module contains the implementation of the `stow` commands.

pub mod stow_download;
pub mod stow_info;
pub mod stow_install;
pub mod stow_list;
pub mod stow_remove;

pub use stow_download::{download, download_requirements, DownloadOptions, DownloadReport};
pub use stow_info::{format_entry, info, info_requirements, InfoEntry, InfoReport};
pub use stow_install::{
    failure_summary, install, Failure, InstallOptions, InstallReport, Installer, Skipped, Stage, EXIT_SOFTWARE,
};
pub use stow_list::{format_list, list};
pub use stow_remove::remove;
