//! Torrent client types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from torrent client operations.
#[derive(Debug, Error)]
pub enum TorrentClientError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Torrent not found: {0}")]
    TorrentNotFound(String),

    #[error("Invalid torrent: {0}")]
    InvalidTorrent(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Request timed out")]
    Timeout,
}

/// Download state of a torrent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorrentState {
    Downloading,
    Seeding,
    /// Stopped by the user.
    Paused,
    Checking,
    Queued,
    Stalled,
    Error,
    Unknown,
}

impl TorrentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TorrentState::Downloading => "downloading",
            TorrentState::Seeding => "seeding",
            TorrentState::Paused => "paused",
            TorrentState::Checking => "checking",
            TorrentState::Queued => "queued",
            TorrentState::Stalled => "stalled",
            TorrentState::Error => "error",
            TorrentState::Unknown => "unknown",
        }
    }
}

/// A torrent known to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TorrentDownload {
    /// Info hash, lowercase.
    pub hash: String,
    pub name: String,
    pub state: TorrentState,
    /// Where the content is (or will be) stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub size_bytes: u64,
    pub completed_bytes: u64,
    /// All wanted pieces are on disk.
    pub completed: bool,
    /// 0.0 to 1.0.
    pub progress: f64,
    pub ratio: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
}

/// A file inside a torrent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorrentFile {
    /// Path relative to the torrent's save path.
    pub path: String,
    pub size_bytes: u64,
    pub progress: f64,
}

/// A torrent to hand over to the client.
#[derive(Debug, Clone)]
pub enum AddTorrentRequest {
    /// Magnet link or HTTP(S) URL of a .torrent file.
    Url {
        url: String,
        download_path: Option<String>,
        paused: bool,
    },
    /// Raw .torrent file contents.
    TorrentFile {
        data: Vec<u8>,
        filename: Option<String>,
        download_path: Option<String>,
        paused: bool,
    },
}

impl AddTorrentRequest {
    pub fn url(url: impl Into<String>) -> Self {
        AddTorrentRequest::Url {
            url: url.into(),
            download_path: None,
            paused: false,
        }
    }

    pub fn file(data: Vec<u8>) -> Self {
        AddTorrentRequest::TorrentFile {
            data,
            filename: None,
            download_path: None,
            paused: false,
        }
    }

    pub fn with_filename(mut self, name: impl Into<String>) -> Self {
        if let AddTorrentRequest::TorrentFile { filename, .. } = &mut self {
            *filename = Some(name.into());
        }
        self
    }

    pub fn with_download_path(mut self, path: impl Into<String>) -> Self {
        match &mut self {
            AddTorrentRequest::Url { download_path, .. }
            | AddTorrentRequest::TorrentFile { download_path, .. } => {
                *download_path = Some(path.into());
            }
        }
        self
    }

    pub fn paused(mut self) -> Self {
        match &mut self {
            AddTorrentRequest::Url { paused, .. }
            | AddTorrentRequest::TorrentFile { paused, .. } => *paused = true,
        }
        self
    }
}

/// Result of adding a torrent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTorrentResult {
    /// Known up front only for magnet links.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

/// A remote torrent client that downloads into the movie directories.
#[async_trait]
pub trait TorrentClient: Send + Sync {
    /// Backend name, used in logs and the API.
    fn name(&self) -> &str;

    async fn add_torrent(
        &self,
        request: AddTorrentRequest,
    ) -> Result<AddTorrentResult, TorrentClientError>;

    async fn list_torrents(&self) -> Result<Vec<TorrentDownload>, TorrentClientError>;

    async fn get_torrent(&self, hash: &str) -> Result<TorrentDownload, TorrentClientError>;

    async fn torrent_files(&self, hash: &str) -> Result<Vec<TorrentFile>, TorrentClientError>;

    /// Start (or resume) downloading.
    async fn start_torrent(&self, hash: &str) -> Result<(), TorrentClientError>;

    async fn stop_torrent(&self, hash: &str) -> Result<(), TorrentClientError>;

    /// Forget the torrent. Downloaded data is kept unless `delete_files`.
    async fn remove_torrent(&self, hash: &str, delete_files: bool)
        -> Result<(), TorrentClientError>;
}
