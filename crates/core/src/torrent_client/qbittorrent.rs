//! qBittorrent Web API client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::{multipart, Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::{
    AddTorrentRequest, AddTorrentResult, TorrentClient, TorrentClientError, TorrentDownload,
    TorrentFile, TorrentState,
};
use crate::metrics::{EXTERNAL_SERVICE_DURATION, EXTERNAL_SERVICE_REQUESTS};

/// qBittorrent connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QBittorrentConfig {
    /// Web UI address, e.g. `http://localhost:8080`.
    pub url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u32,
    /// Save path for new torrents; the client's default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_path: Option<String>,
}

fn default_timeout_secs() -> u32 {
    30
}

/// qBittorrent client. The session cookie lives in the HTTP client's jar.
pub struct QBittorrentClient {
    client: Client,
    config: QBittorrentConfig,
    authenticated: RwLock<bool>,
}

impl QBittorrentClient {
    pub fn new(config: QBittorrentConfig) -> Result<Self, TorrentClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .cookie_store(true)
            .build()
            .map_err(|e| TorrentClientError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            config,
            authenticated: RwLock::new(false),
        })
    }

    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    async fn login(&self) -> Result<(), TorrentClientError> {
        let url = format!("{}/api/v2/auth/login", self.base_url());
        let params = [
            ("username", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if body.contains("Ok.") {
            debug!("qBittorrent login successful");
            *self.authenticated.write().await = true;
            Ok(())
        } else if body.contains("Fails.") || status == StatusCode::FORBIDDEN {
            Err(TorrentClientError::AuthenticationFailed(
                "Invalid credentials".to_string(),
            ))
        } else {
            Err(TorrentClientError::AuthenticationFailed(format!(
                "Unexpected response: {}",
                body.chars().take(100).collect::<String>()
            )))
        }
    }

    async fn ensure_authenticated(&self) -> Result<(), TorrentClientError> {
        if *self.authenticated.read().await {
            return Ok(());
        }
        self.login().await
    }

    /// Send an authenticated request built by `build` and return the body.
    /// An expired session is renewed once.
    async fn send<F>(
        &self,
        operation: &str,
        endpoint: &str,
        build: F,
    ) -> Result<String, TorrentClientError>
    where
        F: Fn(&Client, &str) -> RequestBuilder + Send + Sync,
    {
        let start = Instant::now();
        let result = self.send_authenticated(endpoint, &build).await;

        EXTERNAL_SERVICE_DURATION
            .with_label_values(&["qbittorrent", operation])
            .observe(start.elapsed().as_secs_f64());
        let status = if result.is_ok() { "success" } else { "error" };
        EXTERNAL_SERVICE_REQUESTS
            .with_label_values(&["qbittorrent", operation, status])
            .inc();

        result
    }

    async fn send_authenticated<F>(
        &self,
        endpoint: &str,
        build: &F,
    ) -> Result<String, TorrentClientError>
    where
        F: Fn(&Client, &str) -> RequestBuilder + Send + Sync,
    {
        self.ensure_authenticated().await?;

        let url = format!("{}{}", self.base_url(), endpoint);
        let response = build(&self.client, &url)
            .send()
            .await
            .map_err(request_error)?;

        if response.status() == StatusCode::FORBIDDEN {
            warn!("qBittorrent session expired, re-authenticating");
            *self.authenticated.write().await = false;
            self.login().await?;

            let response = build(&self.client, &url)
                .send()
                .await
                .map_err(request_error)?;
            return read_body(response).await;
        }

        read_body(response).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<T, TorrentClientError> {
        let body = self
            .send(operation, endpoint, |client, url| client.get(url).query(query))
            .await?;
        serde_json::from_str(&body)
            .map_err(|e| TorrentClientError::ApiError(format!("Failed to parse response: {}", e)))
    }

    async fn post_form(
        &self,
        operation: &str,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<String, TorrentClientError> {
        self.send(operation, endpoint, |client, url| client.post(url).form(params))
            .await
    }

    /// Multipart form for `/torrents/add`. Rebuilt for every attempt.
    fn add_form(&self, request: &AddTorrentRequest) -> multipart::Form {
        let (form, download_path, paused) = match request {
            AddTorrentRequest::Url {
                url,
                download_path,
                paused,
            } => (
                multipart::Form::new().text("urls", url.clone()),
                download_path,
                *paused,
            ),
            AddTorrentRequest::TorrentFile {
                data,
                filename,
                download_path,
                paused,
            } => {
                let part = multipart::Part::bytes(data.clone()).file_name(
                    filename
                        .clone()
                        .unwrap_or_else(|| "movie.torrent".to_string()),
                );
                (
                    multipart::Form::new().part("torrents", part),
                    download_path,
                    *paused,
                )
            }
        };

        let mut form = form;
        if let Some(path) = download_path.as_ref().or(self.config.download_path.as_ref()) {
            form = form.text("savepath", path.clone());
        }
        if paused {
            form = form.text("paused", "true").text("stopped", "true");
        }
        form
    }
}

fn request_error(e: reqwest::Error) -> TorrentClientError {
    if e.is_timeout() {
        TorrentClientError::Timeout
    } else if e.is_connect() {
        TorrentClientError::ConnectionFailed(e.to_string())
    } else {
        TorrentClientError::ApiError(e.to_string())
    }
}

async fn read_body(response: Response) -> Result<String, TorrentClientError> {
    let status = response.status();
    if status == StatusCode::UNSUPPORTED_MEDIA_TYPE {
        return Err(TorrentClientError::InvalidTorrent(
            "Rejected by qBittorrent".to_string(),
        ));
    }
    if !status.is_success() {
        return Err(TorrentClientError::ApiError(format!("HTTP {}", status)));
    }
    response.text().await.map_err(request_error)
}

/// qBittorrent `/torrents/info` entry.
#[derive(Debug, Deserialize)]
struct QBTorrentInfo {
    hash: String,
    name: String,
    state: String,
    #[serde(default)]
    progress: f64,
    /// Size of the wanted files.
    #[serde(default)]
    size: i64,
    #[serde(default)]
    completed: i64,
    #[serde(default)]
    ratio: f64,
    #[serde(default)]
    added_on: i64,
    #[serde(default)]
    save_path: String,
    #[serde(default)]
    content_path: String,
}

impl QBTorrentInfo {
    fn into_download(self) -> TorrentDownload {
        let size_bytes = self.size.max(0) as u64;
        let completed_bytes = self.completed.max(0) as u64;
        let path = [self.content_path, self.save_path]
            .into_iter()
            .find(|p| !p.is_empty());

        TorrentDownload {
            hash: self.hash.to_lowercase(),
            name: self.name,
            state: parse_qb_state(&self.state),
            path,
            size_bytes,
            completed_bytes,
            completed: self.progress >= 1.0 || (size_bytes > 0 && completed_bytes >= size_bytes),
            progress: self.progress,
            ratio: self.ratio,
            added_at: timestamp_to_datetime(self.added_on),
        }
    }
}

/// qBittorrent `/torrents/files` entry.
#[derive(Debug, Deserialize)]
struct QBTorrentFile {
    name: String,
    #[serde(default)]
    size: i64,
    #[serde(default)]
    progress: f64,
}

fn parse_qb_state(state: &str) -> TorrentState {
    match state {
        "downloading" | "forcedDL" | "metaDL" | "forcedMetaDL" | "allocating" => {
            TorrentState::Downloading
        }
        "uploading" | "forcedUP" => TorrentState::Seeding,
        "pausedDL" | "pausedUP" | "stoppedDL" | "stoppedUP" => TorrentState::Paused,
        "checkingDL" | "checkingUP" | "checkingResumeData" | "moving" => TorrentState::Checking,
        "queuedDL" | "queuedUP" => TorrentState::Queued,
        "stalledDL" | "stalledUP" => TorrentState::Stalled,
        "error" | "missingFiles" => TorrentState::Error,
        _ => TorrentState::Unknown,
    }
}

fn timestamp_to_datetime(ts: i64) -> Option<DateTime<Utc>> {
    if ts > 0 {
        Utc.timestamp_opt(ts, 0).single()
    } else {
        None
    }
}

/// Info hash of a magnet link, lowercase.
fn extract_hash_from_magnet(magnet: &str) -> Option<String> {
    let (_, query) = magnet.strip_prefix("magnet:")?.split_once('?')?;
    query
        .split('&')
        .find_map(|param| param.strip_prefix("xt=urn:btih:"))
        .filter(|hash| !hash.is_empty())
        .map(str::to_lowercase)
}

#[async_trait]
impl TorrentClient for QBittorrentClient {
    fn name(&self) -> &str {
        "qbittorrent"
    }

    async fn add_torrent(
        &self,
        request: AddTorrentRequest,
    ) -> Result<AddTorrentResult, TorrentClientError> {
        let body = self
            .send("add", "/api/v2/torrents/add", |client, url| {
                client.post(url).multipart(self.add_form(&request))
            })
            .await?;

        if body.contains("Fails.") {
            return Err(TorrentClientError::InvalidTorrent(
                "Rejected by qBittorrent".to_string(),
            ));
        }

        let hash = match &request {
            AddTorrentRequest::Url { url, .. } => extract_hash_from_magnet(url),
            AddTorrentRequest::TorrentFile { .. } => None,
        };
        Ok(AddTorrentResult { hash })
    }

    async fn list_torrents(&self) -> Result<Vec<TorrentDownload>, TorrentClientError> {
        let torrents: Vec<QBTorrentInfo> =
            self.get_json("list", "/api/v2/torrents/info", &[]).await?;
        Ok(torrents.into_iter().map(QBTorrentInfo::into_download).collect())
    }

    async fn get_torrent(&self, hash: &str) -> Result<TorrentDownload, TorrentClientError> {
        let hash = hash.to_lowercase();
        let torrents: Vec<QBTorrentInfo> = self
            .get_json("get", "/api/v2/torrents/info", &[("hashes", &hash)])
            .await?;

        torrents
            .into_iter()
            .next()
            .map(QBTorrentInfo::into_download)
            .ok_or(TorrentClientError::TorrentNotFound(hash))
    }

    async fn torrent_files(&self, hash: &str) -> Result<Vec<TorrentFile>, TorrentClientError> {
        let torrent = self.get_torrent(hash).await?;
        let files: Vec<QBTorrentFile> = self
            .get_json("files", "/api/v2/torrents/files", &[("hash", &torrent.hash)])
            .await?;

        Ok(files
            .into_iter()
            .map(|f| TorrentFile {
                path: f.name,
                size_bytes: f.size.max(0) as u64,
                progress: f.progress,
            })
            .collect())
    }

    async fn start_torrent(&self, hash: &str) -> Result<(), TorrentClientError> {
        let torrent = self.get_torrent(hash).await?;
        self.post_form("start", "/api/v2/torrents/resume", &[("hashes", &torrent.hash)])
            .await?;
        Ok(())
    }

    async fn stop_torrent(&self, hash: &str) -> Result<(), TorrentClientError> {
        let torrent = self.get_torrent(hash).await?;
        self.post_form("stop", "/api/v2/torrents/pause", &[("hashes", &torrent.hash)])
            .await?;
        Ok(())
    }

    async fn remove_torrent(
        &self,
        hash: &str,
        delete_files: bool,
    ) -> Result<(), TorrentClientError> {
        let torrent = self.get_torrent(hash).await?;
        let delete_files = if delete_files { "true" } else { "false" };
        self.post_form(
            "remove",
            "/api/v2/torrents/delete",
            &[("hashes", &torrent.hash), ("deleteFiles", delete_files)],
        )
        .await?;
        Ok(())
    }
}
