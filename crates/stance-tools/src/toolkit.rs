//! Tool factory used by the pipeline stages
//!
//! Stages ask the toolkit for tools instead of constructing adapters, so a
//! run can be wired to the real services, a cache, or test fakes.

use crate::actor::ActorClient;
use crate::instagram::InstagramPostsTool;
use crate::resolver::HandleResolverTool;
use crate::scrape::ScrapeSettings;
use crate::x::XPostsTool;
use stance_agent::DynTool;
use stance_schema::Network;
use std::sync::Arc;

/// Source of the tools each stage offers to the model
pub trait Toolkit: Send + Sync {
    /// Name → handle resolver
    fn handle_resolver(&self) -> Arc<dyn DynTool>;

    /// Post scraper for `network`, `None` when the network is not tracked
    fn scraper(&self, network: Network) -> Option<Arc<dyn DynTool>>;
}

/// Toolkit backed by Apify actors
#[derive(Clone)]
pub struct ApifyToolkit {
    client: Arc<dyn ActorClient>,
    settings: ScrapeSettings,
    networks: Vec<Network>,
}

impl ApifyToolkit {
    /// Create toolkit tracking every network with default limits
    #[must_use]
    pub fn new(client: Arc<dyn ActorClient>) -> Self {
        Self {
            client,
            settings: ScrapeSettings::default(),
            networks: Network::ALL.to_vec(),
        }
    }

    /// With scraper limits
    #[must_use]
    pub fn with_settings(mut self, settings: ScrapeSettings) -> Self {
        self.settings = settings;
        self
    }

    /// With the tracked networks
    #[must_use]
    pub fn with_networks(mut self, networks: Vec<Network>) -> Self {
        self.networks = networks;
        self
    }
}

impl Toolkit for ApifyToolkit {
    fn handle_resolver(&self) -> Arc<dyn DynTool> {
        Arc::new(HandleResolverTool::new(
            Arc::clone(&self.client),
            self.networks.clone(),
        ))
    }

    fn scraper(&self, network: Network) -> Option<Arc<dyn DynTool>> {
        if !self.networks.contains(&network) {
            return None;
        }
        let client = Arc::clone(&self.client);
        let tool: Arc<dyn DynTool> = match network {
            Network::X => Arc::new(XPostsTool::new(client, self.settings)),
            Network::Instagram => Arc::new(InstagramPostsTool::new(client, self.settings)),
        };
        Some(tool)
    }
}

impl std::fmt::Debug for ApifyToolkit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApifyToolkit")
            .field("settings", &self.settings)
            .field("networks", &self.networks)
            .finish_non_exhaustive()
    }
}
