//! Torrent client API handlers.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use moviebox_core::{
    AddTorrentRequest, AddTorrentResult, TorrentClient, TorrentClientError, TorrentDownload,
    TorrentFile,
};

use super::{error_response, ApiError, SuccessResponse};
use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AddFromUrlRequest {
    /// Magnet link or .torrent URL.
    pub url: String,
    #[serde(default)]
    pub download_path: Option<String>,
    #[serde(default)]
    pub paused: bool,
}

#[derive(Debug, Deserialize)]
pub struct RemoveTorrentParams {
    #[serde(default)]
    pub delete_files: bool,
}

#[derive(Debug, Serialize)]
pub struct TorrentListResponse {
    pub torrents: Vec<TorrentDownload>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct TorrentFilesResponse {
    pub files: Vec<TorrentFile>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct TorrentClientStatusResponse {
    pub backend: String,
    pub configured: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/torrents/status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<TorrentClientStatusResponse> {
    Json(match state.torrent_client() {
        Some(client) => TorrentClientStatusResponse {
            backend: client.name().to_string(),
            configured: true,
        },
        None => TorrentClientStatusResponse {
            backend: "none".to_string(),
            configured: false,
        },
    })
}

/// GET /api/v1/torrents
pub async fn list_torrents(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TorrentListResponse>, ApiError> {
    let torrents = client(&state)?
        .list_torrents()
        .await
        .map_err(torrent_error)?;
    let count = torrents.len();
    Ok(Json(TorrentListResponse { torrents, count }))
}

/// GET /api/v1/torrents/{hash}
pub async fn get_torrent(
    State(state): State<Arc<AppState>>,
    Path(hash): Path<String>,
) -> Result<Json<TorrentDownload>, ApiError> {
    client(&state)?
        .get_torrent(&hash)
        .await
        .map(Json)
        .map_err(torrent_error)
}

/// GET /api/v1/torrents/{hash}/files
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    Path(hash): Path<String>,
) -> Result<Json<TorrentFilesResponse>, ApiError> {
    let files = client(&state)?
        .torrent_files(&hash)
        .await
        .map_err(torrent_error)?;
    let count = files.len();
    Ok(Json(TorrentFilesResponse { files, count }))
}

/// POST /api/v1/torrents/add/url
pub async fn add_from_url(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AddFromUrlRequest>,
) -> Result<Json<AddTorrentResult>, ApiError> {
    let client = client(&state)?;
    let url = body.url.trim();
    if url.is_empty() {
        return Err(error_response(StatusCode::BAD_REQUEST, "URL cannot be empty"));
    }

    let mut request = AddTorrentRequest::url(url);
    if let Some(path) = body.download_path.filter(|p| !p.is_empty()) {
        request = request.with_download_path(path);
    }
    if body.paused {
        request = request.paused();
    }

    let result = client.add_torrent(request).await.map_err(torrent_error)?;
    info!("Added torrent from URL via {}", client.name());
    Ok(Json(result))
}

/// POST /api/v1/torrents/add/file
///
/// Multipart upload: `file` holds the .torrent, optional `download_path`
/// and `paused` fields.
pub async fn add_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<AddTorrentResult>, ApiError> {
    let client = client(&state)?;

    let mut torrent_data: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;
    let mut download_path: Option<String> = None;
    let mut paused = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, e))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                filename = field.file_name().map(|s| s.to_string());
                let bytes = field.bytes().await.map_err(|e| {
                    error_response(
                        StatusCode::BAD_REQUEST,
                        format!("Failed to read file: {}", e),
                    )
                })?;
                torrent_data = Some(bytes.to_vec());
            }
            "download_path" => {
                if let Ok(text) = field.text().await {
                    if !text.is_empty() {
                        download_path = Some(text);
                    }
                }
            }
            "paused" => {
                if let Ok(text) = field.text().await {
                    paused = text == "true" || text == "1";
                }
            }
            _ => {}
        }
    }

    let data = match torrent_data {
        Some(d) if !d.is_empty() => d,
        _ => {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                "No torrent file provided",
            ))
        }
    };

    let mut request = AddTorrentRequest::file(data);
    if let Some(name) = filename.clone() {
        request = request.with_filename(name);
    }
    if let Some(path) = download_path {
        request = request.with_download_path(path);
    }
    if paused {
        request = request.paused();
    }

    let result = client.add_torrent(request).await.map_err(torrent_error)?;
    info!(
        "Added torrent file {} via {}",
        filename.as_deref().unwrap_or("(unnamed)"),
        client.name()
    );
    Ok(Json(result))
}

/// POST /api/v1/torrents/{hash}/start
pub async fn start_torrent(
    State(state): State<Arc<AppState>>,
    Path(hash): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    client(&state)?
        .start_torrent(&hash)
        .await
        .map_err(torrent_error)?;
    Ok(Json(SuccessResponse {
        message: format!("Torrent {} started", hash),
    }))
}

/// POST /api/v1/torrents/{hash}/stop
pub async fn stop_torrent(
    State(state): State<Arc<AppState>>,
    Path(hash): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    client(&state)?
        .stop_torrent(&hash)
        .await
        .map_err(torrent_error)?;
    Ok(Json(SuccessResponse {
        message: format!("Torrent {} stopped", hash),
    }))
}

/// DELETE /api/v1/torrents/{hash}
///
/// Downloaded files are kept unless `delete_files=true`.
pub async fn remove_torrent(
    State(state): State<Arc<AppState>>,
    Path(hash): Path<String>,
    Query(params): Query<RemoveTorrentParams>,
) -> Result<Json<SuccessResponse>, ApiError> {
    client(&state)?
        .remove_torrent(&hash, params.delete_files)
        .await
        .map_err(torrent_error)?;
    info!("Removed torrent {} (delete_files={})", hash, params.delete_files);
    Ok(Json(SuccessResponse {
        message: format!("Torrent {} removed", hash),
    }))
}

fn client(state: &AppState) -> Result<Arc<dyn TorrentClient>, ApiError> {
    state.torrent_client().cloned().ok_or_else(|| {
        error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Torrent client not configured",
        )
    })
}

/// Unknown hashes are 404 and rejected torrents 400. Anything else is a
/// failure of the remote client.
fn torrent_error(e: TorrentClientError) -> ApiError {
    let status = match e {
        TorrentClientError::TorrentNotFound(_) => StatusCode::NOT_FOUND,
        TorrentClientError::InvalidTorrent(_) => StatusCode::BAD_REQUEST,
        TorrentClientError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::BAD_GATEWAY,
    };
    error_response(status, e)
}
