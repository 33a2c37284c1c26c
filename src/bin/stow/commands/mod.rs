//! Command implementations

pub mod download;
pub mod info;
pub mod install;
pub mod list;
pub mod remove;
