//! Shared utilities

pub mod config;
pub mod context;
pub mod diagnostic;
pub mod fs;
pub mod hash;
pub mod http;
pub mod shell;

pub use config::Config;
pub use context::{ContextOverrides, GlobalContext};
pub use diagnostic::Diagnostic;
pub use shell::{NullReporter, Reporter, Shell, Status};
