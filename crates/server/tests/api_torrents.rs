//! Integration tests for the torrent API.

#![cfg(unix)]

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::TestFixture;
use moviebox_core::{AddTorrentRequest, TorrentClientError};

#[tokio::test]
async fn test_status_reports_backend() {
    let fixture = TestFixture::new(&[]).await;

    let response = fixture.get("/api/v1/torrents/status").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["backend"], "mock");
    assert_eq!(response.body["configured"], true);
}

#[tokio::test]
async fn test_unconfigured_client_is_unavailable() {
    let fixture = TestFixture::without_torrent_client(&[]).await;

    let response = fixture.get("/api/v1/torrents/status").await;
    assert_eq!(response.body["configured"], false);

    let response = fixture.get("/api/v1/torrents").await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);

    let response = fixture
        .post("/api/v1/torrents/add/url", json!({ "url": "magnet:?xt=urn:btih:abc" }))
        .await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_add_magnet_and_list() {
    let fixture = TestFixture::new(&[]).await;

    let response = fixture
        .post(
            "/api/v1/torrents/add/url",
            json!({
                "url": "magnet:?xt=urn:btih:ABC123&dn=Alien",
                "download_path": "/media/pi/wd640/movies",
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["hash"], "abc123");

    let added = fixture.torrent_client.added_torrents().await;
    match &added[0] {
        AddTorrentRequest::Url { download_path, .. } => {
            assert_eq!(download_path.as_deref(), Some("/media/pi/wd640/movies"))
        }
        other => panic!("unexpected request {:?}", other),
    }

    let response = fixture.get("/api/v1/torrents").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["count"], 1);
    assert_eq!(response.body["torrents"][0]["hash"], "abc123");
    assert_eq!(response.body["torrents"][0]["state"], "downloading");
}

#[tokio::test]
async fn test_add_url_rejects_blank() {
    let fixture = TestFixture::new(&[]).await;

    let response = fixture
        .post("/api/v1/torrents/add/url", json!({ "url": "  " }))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(fixture.torrent_client.added_torrents().await.is_empty());
}

#[tokio::test]
async fn test_add_file_upload() {
    let fixture = TestFixture::new(&[]).await;

    let response = fixture
        .post_file(
            "/api/v1/torrents/add/file",
            "file",
            "alien.torrent",
            b"d8:announce0:e",
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let added = fixture.torrent_client.added_torrents().await;
    match &added[0] {
        AddTorrentRequest::TorrentFile { data, filename, .. } => {
            assert_eq!(data.as_slice(), b"d8:announce0:e");
            assert_eq!(filename.as_deref(), Some("alien.torrent"));
        }
        other => panic!("unexpected request {:?}", other),
    }
}

#[tokio::test]
async fn test_add_file_without_file_field() {
    let fixture = TestFixture::new(&[]).await;

    let response = fixture
        .post_file("/api/v1/torrents/add/file", "other", "x.txt", b"data")
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_files_and_progress() {
    let fixture = TestFixture::new(&[]).await;
    fixture
        .torrent_client
        .insert(
            "abc",
            "Alien",
            &[("Alien/alien.mkv", 900), ("Alien/alien.srt", 100)],
        )
        .await;
    fixture.torrent_client.set_progress("abc", 1.0).await;

    let response = fixture.get("/api/v1/torrents/abc/files").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["count"], 2);
    assert_eq!(response.body["files"][0]["path"], "Alien/alien.mkv");

    let response = fixture.get("/api/v1/torrents/abc").await;
    assert_eq!(response.body["completed"], true);
    assert_eq!(response.body["completed_bytes"], 1000);
}

#[tokio::test]
async fn test_stop_start_remove() {
    let fixture = TestFixture::new(&[]).await;
    fixture.torrent_client.insert("abc", "Alien", &[]).await;

    let response = fixture.post("/api/v1/torrents/abc/stop", json!({})).await;
    assert_eq!(response.status, StatusCode::OK);
    let response = fixture.get("/api/v1/torrents/abc").await;
    assert_eq!(response.body["state"], "paused");

    let response = fixture.post("/api/v1/torrents/abc/start", json!({})).await;
    assert_eq!(response.status, StatusCode::OK);
    let response = fixture.get("/api/v1/torrents/abc").await;
    assert_eq!(response.body["state"], "downloading");

    let response = fixture.delete("/api/v1/torrents/abc").await;
    assert_eq!(response.status, StatusCode::OK);
    let response = fixture.get("/api/v1/torrents").await;
    assert_eq!(response.body["count"], 0);
}

#[tokio::test]
async fn test_unknown_hash_is_not_found() {
    let fixture = TestFixture::new(&[]).await;

    for response in [
        fixture.get("/api/v1/torrents/deadbeef").await,
        fixture.get("/api/v1/torrents/deadbeef/files").await,
        fixture.post("/api/v1/torrents/deadbeef/stop", json!({})).await,
        fixture.delete("/api/v1/torrents/deadbeef").await,
    ] {
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn test_client_failures_map_to_gateway_errors() {
    let fixture = TestFixture::new(&[]).await;

    fixture
        .torrent_client
        .set_next_error(TorrentClientError::ConnectionFailed("refused".to_string()))
        .await;
    let response = fixture.get("/api/v1/torrents").await;
    assert_eq!(response.status, StatusCode::BAD_GATEWAY);

    fixture
        .torrent_client
        .set_next_error(TorrentClientError::Timeout)
        .await;
    let response = fixture.get("/api/v1/torrents").await;
    assert_eq!(response.status, StatusCode::GATEWAY_TIMEOUT);
}
