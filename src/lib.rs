//! Stowage - a client-side package manager for namespaced collections
//!
//! This crate provides the install/resolve engine behind `stow`: spec
//! parsing, version selection, the fetcher strategies, the installed
//! package index, and the install loop that ties them together.

pub mod archive;
pub mod core;
pub mod installed;
pub mod ops;
pub mod resolver;
pub mod sources;
pub mod util;

/// Test utilities and mocks for stowage unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides a mock HTTP client, a recording display
/// callback, and collection fixtures.
#[cfg(test)]
pub mod test_support;

pub use core::{
    FetchMethod, InstalledRepository, RepositorySpec, Requirement, RequirementSpec, StowError,
};
pub use installed::InstalledIndex;
pub use resolver::{select_version, VersionConstraint};
pub use util::context::GlobalContext;
