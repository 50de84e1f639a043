pub mod cache;
pub mod catalog;
pub mod config;
pub mod details;
pub mod external_catalog;
pub mod metrics;
pub mod testing;
pub mod torrent_client;

pub use cache::LoadingCache;
pub use catalog::{
    CatalogError, CatalogStats, JsonCatalog, Movie, MovieCatalog, MovieId, MovieRecord,
    MovieUpdate, ScanReport,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use details::{DetailsError, DetailsService, MovieDetails};
pub use external_catalog::{ExternalCatalog, ExternalCatalogError, TmdbClient, TmdbConfig};
pub use torrent_client::{
    AddTorrentRequest, AddTorrentResult, QBittorrentClient, QBittorrentConfig, TorrentClient,
    TorrentClientError, TorrentDownload, TorrentFile, TorrentState,
};
