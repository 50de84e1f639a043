use std::sync::Arc;
use moviebox_core::{Config, DetailsService, MovieCatalog, SanitizedConfig, TorrentClient};

/// Shared application state
pub struct AppState {
    config: Config,
    catalog: Arc<dyn MovieCatalog>,
    details: Arc<DetailsService>,
    torrent_client: Option<Arc<dyn TorrentClient>>,
}

impl AppState {
    pub fn new(
        config: Config,
        catalog: Arc<dyn MovieCatalog>,
        details: Arc<DetailsService>,
    ) -> Self {
        Self {
            config,
            catalog,
            details,
            torrent_client: None,
        }
    }

    /// Enable the torrent routes with `client`.
    pub fn with_torrent_client(mut self, client: Arc<dyn TorrentClient>) -> Self {
        self.torrent_client = Some(client);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn catalog(&self) -> &Arc<dyn MovieCatalog> {
        &self.catalog
    }

    pub fn details(&self) -> &DetailsService {
        self.details.as_ref()
    }

    pub fn torrent_client(&self) -> Option<&Arc<dyn TorrentClient>> {
        self.torrent_client.as_ref()
    }
}
