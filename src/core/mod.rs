//! Core data structures for stowage.
//!
//! This module contains the value types used throughout the crate:
//! - Requirement and repository specs, and the spec string parser
//! - Collection manifests and install metadata
//! - The error taxonomy

pub mod error;
pub mod install_info;
pub mod installed;
pub mod manifest;
pub mod repository_spec;
pub mod requirement;
pub mod requirement_spec;
pub mod spec_parse;

pub use error::StowError;
pub use install_info::{InstallInfo, INSTALL_INFO_PATH};
pub use installed::InstalledRepository;
pub use manifest::{CollectionManifest, MANIFEST_FILE};
pub use repository_spec::RepositorySpec;
pub use requirement::{requirements_from_dependencies, Requirement};
pub use requirement_spec::{FetchMethod, RequirementSpec};
pub use spec_parse::{parse_requirement_spec, requirement_spec_from_dependency};
