//! Common test utilities for API testing.
//!
//! This module provides a test fixture that creates an in-process router
//! over a real `JsonCatalog` on a fake host (device links, mount table and
//! mount points inside a temp dir), a mock TMDB provider and a mock
//! torrent client.
#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use moviebox_core::catalog::Scanner;
use moviebox_core::config::{CatalogConfig, DetailsConfig, VolumesConfig};
use moviebox_core::testing::{fixtures::VolumeFixture, MockExternalCatalog, MockTorrentClient};
use moviebox_core::{Config, DetailsService, JsonCatalog, MovieCatalog, TorrentClient};

/// Re-export fixtures for test convenience
pub use moviebox_core::testing::fixtures;

/// Test fixture with a mounted volume `wd640` as the only search directory.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_list() {
///     let fixture = TestFixture::new(&["movie.mkv"]).await;
///     let response = fixture.get("/api/v1/movies").await;
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// The catalog behind the router
    pub catalog: Arc<JsonCatalog>,
    /// Mock TMDB provider - configure movies
    pub external_catalog: Arc<MockExternalCatalog>,
    /// Mock torrent client - configure downloads
    pub torrent_client: Arc<MockTorrentClient>,
    /// Fake host volumes
    pub host: VolumeFixture,
    /// Temporary directory holding everything
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a fixture whose volume holds `files` before the catalog loads.
    pub async fn new(files: &[&str]) -> Self {
        Self::build(files, true).await
    }

    /// Like [`new`](Self::new), with the torrent routes disabled.
    pub async fn without_torrent_client(files: &[&str]) -> Self {
        Self::build(files, false).await
    }

    async fn build(files: &[&str], with_torrent_client: bool) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut host = VolumeFixture::new(temp_dir.path()).expect("Failed to create host");
        let media = host.mount("wd640", "sda1").expect("Failed to mount");
        for file in files {
            let path = media.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, b"").unwrap();
        }

        let config = Config {
            catalog: CatalogConfig {
                dirs: vec![media],
                path: temp_dir.path().join("catalog.json"),
                ..Default::default()
            },
            volumes: VolumesConfig {
                device_dir: host.device_dir(),
                mount_table: host.mount_table(),
            },
            details: DetailsConfig::default(),
            ..Default::default()
        };

        let scanner = Scanner::from_config(host.resolver(), &config.catalog);
        let catalog = Arc::new(JsonCatalog::new(config.catalog.path.clone(), scanner));
        catalog.load().expect("Failed to load catalog");

        let external_catalog = Arc::new(MockExternalCatalog::new());
        let details = DetailsService::new(
            Arc::clone(&catalog) as Arc<dyn MovieCatalog>,
            config.details.langs.clone(),
        )
        .with_tmdb(
            Arc::clone(&external_catalog) as Arc<dyn moviebox_core::ExternalCatalog>,
            "w92",
            "w500",
        );

        let torrent_client = Arc::new(MockTorrentClient::new());
        let mut state = moviebox_server::state::AppState::new(
            config,
            Arc::clone(&catalog) as Arc<dyn MovieCatalog>,
            Arc::new(details),
        );
        if with_torrent_client {
            state = state
                .with_torrent_client(Arc::clone(&torrent_client) as Arc<dyn TorrentClient>);
        }
        let router = moviebox_server::api::create_router(Arc::new(state));

        Self {
            router,
            catalog,
            external_catalog,
            torrent_client,
            host,
            temp_dir,
        }
    }

    /// Mount point of the test volume.
    pub fn media(&self) -> PathBuf {
        self.host.mount_point("wd640")
    }

    /// Create an empty file on the test volume.
    pub fn touch(&self, name: &str) -> PathBuf {
        let path = self.media().join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"").unwrap();
        path
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a PUT request with JSON body.
    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a multipart POST with a single file field `name`.
    pub async fn post_file(
        &self,
        path: &str,
        name: &str,
        filename: &str,
        content: &[u8],
    ) -> TestResponse {
        let boundary = "moviebox-test-boundary";
        let mut body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/x-bittorrent\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Send a GET request and return the raw body text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = match body {
            Some(json) => {
                request_builder = request_builder.header("Content-Type", "application/json");
                Body::from(serde_json::to_vec(&json).unwrap())
            }
            None => Body::empty(),
        };

        let request = request_builder.body(body).unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}
