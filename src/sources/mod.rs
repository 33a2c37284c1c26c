//! Artifact sources.
//!
//! Each fetch method has one [`Fetcher`] implementation. The orchestrator
//! asks a [`FetcherFactory`] for a fresh fetcher per requirement so that
//! scratch space is never shared between requirements.

pub mod fetcher;
pub mod local_file;
pub mod registry;
pub mod remote_url;
pub mod scm;
pub mod shelf;

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use url::Url;

use crate::core::{FetchMethod, RequirementSpec, StowError};
use crate::util::config::DEFAULT_SHELF_NAME;
use crate::util::http::HttpClient;
use crate::util::GlobalContext;

pub use fetcher::{ArtifactHint, ArtifactLocation, FetchResult, Fetcher, FindResult, Scratch};
pub use local_file::LocalFileFetcher;
pub use registry::{RegistryClient, RegistryFetcher};
pub use remote_url::RemoteUrlFetcher;
pub use scm::ScmFetcher;
pub use shelf::ShelfFetcher;

/// Chooses and builds the fetcher for a requirement.
pub trait FetcherFactory: Send + Sync {
    fn fetcher_for(&self, requirement_spec: &RequirementSpec) -> Result<Box<dyn Fetcher>>;
}

/// Factory keyed on [`RequirementSpec::fetch_method`].
///
/// The registry client is shared so the API version is detected once per run.
pub struct DefaultFetcherFactory {
    http: Arc<dyn HttpClient>,
    registry: Arc<RegistryClient>,
    shelves: BTreeMap<String, Url>,
}

impl DefaultFetcherFactory {
    pub fn new(ctx: &GlobalContext, http: Arc<dyn HttpClient>) -> Self {
        DefaultFetcherFactory {
            registry: Arc::new(RegistryClient::new(ctx.server(), http.clone())),
            shelves: ctx.shelves().clone(),
            http,
        }
    }

    fn shelf_fetcher(&self, requirement_spec: &RequirementSpec) -> Result<ShelfFetcher> {
        let name = requirement_spec.shelf().unwrap_or(DEFAULT_SHELF_NAME);
        let uri = self.shelves.get(name).ok_or_else(|| StowError::InvalidSpec {
            spec: requirement_spec.to_string(),
            reason: format!(
                "unknown shelf `{}` (configured: {})",
                name,
                if self.shelves.is_empty() {
                    "none".to_string()
                } else {
                    self.shelves.keys().cloned().collect::<Vec<_>>().join(", ")
                }
            ),
        })?;

        Ok(ShelfFetcher::new(name, uri.clone(), self.http.clone()))
    }
}

impl FetcherFactory for DefaultFetcherFactory {
    fn fetcher_for(&self, requirement_spec: &RequirementSpec) -> Result<Box<dyn Fetcher>> {
        let fetcher: Box<dyn Fetcher> = match requirement_spec.fetch_method() {
            FetchMethod::Registry => Box::new(RegistryFetcher::new(self.registry.clone())),
            FetchMethod::ScmUrl => Box::new(ScmFetcher::new()),
            FetchMethod::LocalFile => Box::new(LocalFileFetcher::new()),
            FetchMethod::RemoteUrl => Box::new(RemoteUrlFetcher::new(self.http.clone())),
            FetchMethod::Shelf => Box::new(self.shelf_fetcher(requirement_spec)?),
        };

        tracing::debug!("{} -> {} fetcher", requirement_spec.label(), fetcher.fetch_method());
        Ok(fetcher)
    }
}
