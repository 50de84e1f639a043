use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::external_catalog::TmdbConfig;
use crate::torrent_client::QBittorrentConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub volumes: VolumesConfig,
    #[serde(default)]
    pub details: DetailsConfig,
    #[serde(default)]
    pub tmdb: Option<TmdbConfig>,
    /// Remote torrent client; torrent routes are disabled when unset.
    #[serde(default)]
    pub torrent: Option<QBittorrentConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8000
}

/// Catalog configuration: where to look for movies and where to keep the registry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    /// Directories to scan, in order.
    #[serde(default)]
    pub dirs: Vec<PathBuf>,
    /// Accepted file extensions (e.g. ".mkv"). The leading dot is optional.
    #[serde(default = "default_video_file_exts")]
    pub video_file_exts: Vec<String>,
    /// Location of the persisted catalog document.
    #[serde(default = "default_catalog_path")]
    pub path: PathBuf,
    /// Interval for background refreshes; disabled when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_interval_secs: Option<u64>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            dirs: Vec::new(),
            video_file_exts: default_video_file_exts(),
            path: default_catalog_path(),
            refresh_interval_secs: None,
        }
    }
}

fn default_video_file_exts() -> Vec<String> {
    vec![".avi".to_string(), ".mkv".to_string()]
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("catalog.json")
}

/// Host locations used to resolve storage volumes.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VolumesConfig {
    /// Directory holding the `by-label` and `by-id` device links.
    #[serde(default = "default_device_dir")]
    pub device_dir: PathBuf,
    /// Live mount table.
    #[serde(default = "default_mount_table")]
    pub mount_table: PathBuf,
}

impl Default for VolumesConfig {
    fn default() -> Self {
        Self {
            device_dir: default_device_dir(),
            mount_table: default_mount_table(),
        }
    }
}

fn default_device_dir() -> PathBuf {
    PathBuf::from("/dev/disk")
}

fn default_mount_table() -> PathBuf {
    PathBuf::from("/etc/mtab")
}

/// Movie details configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DetailsConfig {
    /// Languages to load details in; the first one is the default.
    #[serde(default = "default_langs")]
    pub langs: Vec<String>,
}

impl Default for DetailsConfig {
    fn default() -> Self {
        Self {
            langs: default_langs(),
        }
    }
}

fn default_langs() -> Vec<String> {
    vec!["en".to_string()]
}

impl DetailsConfig {
    /// The language used when a request does not name one.
    pub fn default_lang(&self) -> &str {
        self.langs.first().map(String::as_str).unwrap_or("en")
    }
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub catalog: CatalogConfig,
    pub volumes: VolumesConfig,
    pub details: DetailsConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmdb: Option<SanitizedTmdbConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub torrent: Option<SanitizedTorrentConfig>,
}

/// Sanitized TMDB config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTmdbConfig {
    pub api_key_configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub poster_small: String,
    pub poster_large: String,
}

/// Sanitized torrent client config (password hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTorrentConfig {
    pub url: String,
    pub username: String,
    pub password_configured: bool,
    pub timeout_secs: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_path: Option<String>,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            catalog: config.catalog.clone(),
            volumes: config.volumes.clone(),
            details: config.details.clone(),
            tmdb: config.tmdb.as_ref().map(|t| SanitizedTmdbConfig {
                api_key_configured: !t.api_key.is_empty(),
                base_url: t.base_url.clone(),
                poster_small: t.poster_small.clone(),
                poster_large: t.poster_large.clone(),
            }),
            torrent: config.torrent.as_ref().map(|t| SanitizedTorrentConfig {
                url: t.url.clone(),
                username: t.username.clone(),
                password_configured: !t.password.is_empty(),
                timeout_secs: t.timeout_secs,
                download_path: t.download_path.clone(),
            }),
        }
    }
}
