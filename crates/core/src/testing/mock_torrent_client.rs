//! Mock torrent client for testing.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::torrent_client::{
    AddTorrentRequest, AddTorrentResult, TorrentClient, TorrentClientError, TorrentDownload,
    TorrentFile, TorrentState,
};

/// Mock implementation of the TorrentClient trait.
///
/// Added torrents get a generated hash (or the magnet's own), start
/// downloading at zero progress and can be advanced with
/// [`set_progress`](Self::set_progress).
///
/// # Example
///
/// ```rust,ignore
/// let client = MockTorrentClient::new();
/// client.add_torrent(AddTorrentRequest::url("magnet:?xt=urn:btih:abc")).await?;
/// client.set_progress("abc", 1.0).await;
/// assert!(client.get_torrent("abc").await?.completed);
/// ```
#[derive(Debug)]
pub struct MockTorrentClient {
    /// Every add_torrent request, in order.
    added: Arc<RwLock<Vec<AddTorrentRequest>>>,
    torrents: Arc<RwLock<BTreeMap<String, (TorrentDownload, Vec<TorrentFile>)>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<TorrentClientError>>>,
    hash_counter: Arc<RwLock<u32>>,
    default_save_path: String,
}

impl Default for MockTorrentClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTorrentClient {
    pub fn new() -> Self {
        Self {
            added: Arc::new(RwLock::new(Vec::new())),
            torrents: Arc::new(RwLock::new(BTreeMap::new())),
            next_error: Arc::new(RwLock::new(None)),
            hash_counter: Arc::new(RwLock::new(0)),
            default_save_path: "/mock/downloads".to_string(),
        }
    }

    /// All add_torrent requests received so far.
    pub async fn added_torrents(&self) -> Vec<AddTorrentRequest> {
        self.added.read().await.clone()
    }

    /// Register a torrent directly, bypassing add_torrent.
    pub async fn insert(&self, hash: &str, name: &str, files: &[(&str, u64)]) {
        let size: u64 = files.iter().map(|(_, size)| size).sum();
        let download = TorrentDownload {
            hash: hash.to_lowercase(),
            name: name.to_string(),
            state: TorrentState::Downloading,
            path: Some(format!("{}/{}", self.default_save_path, name)),
            size_bytes: size,
            completed_bytes: 0,
            completed: false,
            progress: 0.0,
            ratio: 0.0,
            added_at: Some(Utc::now()),
        };
        let files = files
            .iter()
            .map(|(path, size)| TorrentFile {
                path: path.to_string(),
                size_bytes: *size,
                progress: 0.0,
            })
            .collect();
        self.torrents
            .write()
            .await
            .insert(download.hash.clone(), (download, files));
    }

    /// Set download progress (0.0 to 1.0). Complete torrents seed.
    pub async fn set_progress(&self, hash: &str, progress: f64) {
        let mut torrents = self.torrents.write().await;
        if let Some((download, files)) = torrents.get_mut(hash) {
            let progress = progress.clamp(0.0, 1.0);
            download.progress = progress;
            download.completed_bytes = (download.size_bytes as f64 * progress) as u64;
            download.completed = progress >= 1.0;
            if download.completed {
                download.state = TorrentState::Seeding;
            }
            for file in files.iter_mut() {
                file.progress = progress;
            }
        }
    }

    /// Make the next operation fail with `error`.
    pub async fn set_next_error(&self, error: TorrentClientError) {
        *self.next_error.write().await = Some(error);
    }

    async fn check_error(&self) -> Result<(), TorrentClientError> {
        match self.next_error.write().await.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn next_hash(&self) -> String {
        let mut counter = self.hash_counter.write().await;
        *counter += 1;
        format!("{:040x}", *counter)
    }

    async fn update<F>(&self, hash: &str, f: F) -> Result<(), TorrentClientError>
    where
        F: FnOnce(&mut TorrentDownload) + Send,
    {
        self.check_error().await?;
        let hash = hash.to_lowercase();
        let mut torrents = self.torrents.write().await;
        let (download, _) = torrents
            .get_mut(&hash)
            .ok_or(TorrentClientError::TorrentNotFound(hash.clone()))?;
        f(download);
        Ok(())
    }
}

#[async_trait]
impl TorrentClient for MockTorrentClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn add_torrent(
        &self,
        request: AddTorrentRequest,
    ) -> Result<AddTorrentResult, TorrentClientError> {
        self.check_error().await?;
        self.added.write().await.push(request.clone());

        let (hash, name, returned) = match &request {
            AddTorrentRequest::Url { url, .. } => {
                let magnet_hash = url
                    .split_once("xt=urn:btih:")
                    .map(|(_, rest)| rest.split('&').next().unwrap_or(rest).to_lowercase());
                match magnet_hash {
                    Some(hash) => (hash.clone(), hash.clone(), Some(hash)),
                    None => {
                        let hash = self.next_hash().await;
                        let name = url.rsplit('/').next().unwrap_or(url).to_string();
                        (hash, name, None)
                    }
                }
            }
            AddTorrentRequest::TorrentFile { data, filename, .. } => {
                if data.is_empty() {
                    return Err(TorrentClientError::InvalidTorrent(
                        "Empty torrent file".to_string(),
                    ));
                }
                let hash = self.next_hash().await;
                let name = filename.clone().unwrap_or_else(|| hash.clone());
                (hash, name, None)
            }
        };

        self.insert(&hash, &name, &[]).await;
        if matches!(
            request,
            AddTorrentRequest::Url { paused: true, .. }
                | AddTorrentRequest::TorrentFile { paused: true, .. }
        ) {
            self.update(&hash, |d| d.state = TorrentState::Paused).await?;
        }

        Ok(AddTorrentResult { hash: returned })
    }

    async fn list_torrents(&self) -> Result<Vec<TorrentDownload>, TorrentClientError> {
        self.check_error().await?;
        Ok(self
            .torrents
            .read()
            .await
            .values()
            .map(|(download, _)| download.clone())
            .collect())
    }

    async fn get_torrent(&self, hash: &str) -> Result<TorrentDownload, TorrentClientError> {
        self.check_error().await?;
        let hash = hash.to_lowercase();
        self.torrents
            .read()
            .await
            .get(&hash)
            .map(|(download, _)| download.clone())
            .ok_or(TorrentClientError::TorrentNotFound(hash))
    }

    async fn torrent_files(&self, hash: &str) -> Result<Vec<TorrentFile>, TorrentClientError> {
        self.check_error().await?;
        let hash = hash.to_lowercase();
        self.torrents
            .read()
            .await
            .get(&hash)
            .map(|(_, files)| files.clone())
            .ok_or(TorrentClientError::TorrentNotFound(hash))
    }

    async fn start_torrent(&self, hash: &str) -> Result<(), TorrentClientError> {
        self.update(hash, |d| {
            d.state = if d.completed {
                TorrentState::Seeding
            } else {
                TorrentState::Downloading
            };
        })
        .await
    }

    async fn stop_torrent(&self, hash: &str) -> Result<(), TorrentClientError> {
        self.update(hash, |d| d.state = TorrentState::Paused).await
    }

    async fn remove_torrent(
        &self,
        hash: &str,
        _delete_files: bool,
    ) -> Result<(), TorrentClientError> {
        self.check_error().await?;
        let hash = hash.to_lowercase();
        self.torrents
            .write()
            .await
            .remove(&hash)
            .map(|_| ())
            .ok_or(TorrentClientError::TorrentNotFound(hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_magnet_uses_its_hash() {
        let client = MockTorrentClient::new();
        let result = client
            .add_torrent(AddTorrentRequest::url("magnet:?xt=urn:btih:ABCDEF&dn=Alien"))
            .await
            .unwrap();

        assert_eq!(result.hash.as_deref(), Some("abcdef"));
        assert_eq!(client.list_torrents().await.unwrap().len(), 1);
        assert_eq!(client.added_torrents().await.len(), 1);
    }

    #[tokio::test]
    async fn test_progress_completes_torrent() {
        let client = MockTorrentClient::new();
        client
            .insert("abc", "Alien", &[("Alien/alien.mkv", 1000)])
            .await;

        client.set_progress("abc", 1.0).await;

        let download = client.get_torrent("abc").await.unwrap();
        assert!(download.completed);
        assert_eq!(download.completed_bytes, 1000);
        assert_eq!(download.state, TorrentState::Seeding);
        assert_eq!(client.torrent_files("abc").await.unwrap()[0].progress, 1.0);
    }

    #[tokio::test]
    async fn test_stop_start_and_remove() {
        let client = MockTorrentClient::new();
        client.insert("abc", "Alien", &[]).await;

        client.stop_torrent("abc").await.unwrap();
        assert_eq!(
            client.get_torrent("abc").await.unwrap().state,
            TorrentState::Paused
        );
        client.start_torrent("ABC").await.unwrap();
        assert_eq!(
            client.get_torrent("abc").await.unwrap().state,
            TorrentState::Downloading
        );

        client.remove_torrent("abc", false).await.unwrap();
        assert!(matches!(
            client.get_torrent("abc").await,
            Err(TorrentClientError::TorrentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_next_error_fails_once() {
        let client = MockTorrentClient::new();
        client.set_next_error(TorrentClientError::Timeout).await;

        assert!(matches!(
            client.list_torrents().await,
            Err(TorrentClientError::Timeout)
        ));
        assert!(client.list_torrents().await.is_ok());
    }
}
