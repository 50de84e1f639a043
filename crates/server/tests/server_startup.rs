use std::fs;
use std::net::TcpListener;
use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use tempfile::TempDir;
use tokio::time::{sleep, timeout};

/// Find an available port
fn get_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Write a minimal valid config whose files all live in `dir`
fn write_minimal_config(dir: &Path, port: u16) -> std::path::PathBuf {
    let movies = dir.join("movies");
    fs::create_dir_all(&movies).unwrap();
    fs::create_dir_all(dir.join("disk")).unwrap();
    fs::write(movies.join("alien.mkv"), b"").unwrap();

    let config = format!(
        r#"
[server]
host = "127.0.0.1"
port = {port}

[catalog]
dirs = ['{movies}']
path = '{catalog}'

[volumes]
device_dir = '{disk}'
mount_table = '{mtab}'
"#,
        port = port,
        movies = movies.display(),
        catalog = dir.join("catalog.json").display(),
        disk = dir.join("disk").display(),
        mtab = dir.join("mtab").display(),
    );

    let path = dir.join("config.toml");
    fs::write(&path, config).unwrap();
    path
}

/// Spawn the server and return a handle
async fn spawn_server(config_path: &Path) -> tokio::process::Child {
    tokio::process::Command::new(env!("CARGO_BIN_EXE_moviebox"))
        .env("MOVIEBOX_CONFIG", config_path)
        .env("RUST_LOG", "error") // Quiet logs during tests
        .kill_on_drop(true)
        .spawn()
        .expect("Failed to spawn server")
}

/// Wait for server to be ready
async fn wait_for_server(port: u16, max_attempts: u32) -> bool {
    let client = Client::new();
    for _ in 0..max_attempts {
        if client
            .get(format!("http://127.0.0.1:{}/api/v1/health", port))
            .send()
            .await
            .is_ok()
        {
            return true;
        }
        sleep(Duration::from_millis(50)).await;
    }
    false
}

/// Run the binary with `config_path` and return its exit output
async fn run_to_exit(config_path: &Path) -> std::process::Output {
    timeout(
        Duration::from_secs(5),
        tokio::process::Command::new(env!("CARGO_BIN_EXE_moviebox"))
            .env("MOVIEBOX_CONFIG", config_path)
            .env("RUST_LOG", "error")
            .output(),
    )
    .await
    .expect("Command timed out")
    .expect("Failed to execute command")
}

#[tokio::test]
async fn test_health_endpoint() {
    let temp_dir = TempDir::new().unwrap();
    let port = get_available_port();
    let config_path = write_minimal_config(temp_dir.path(), port);

    let mut server = spawn_server(&config_path).await;
    assert!(
        wait_for_server(port, 40).await,
        "Server did not start in time"
    );

    let response = Client::new()
        .get(format!("http://127.0.0.1:{}/api/v1/health", port))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let json: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(json["status"], "ok");

    server.kill().await.ok();
}

#[tokio::test]
async fn test_config_endpoint_returns_sanitized() {
    let temp_dir = TempDir::new().unwrap();
    let port = get_available_port();
    let config_path = write_minimal_config(temp_dir.path(), port);

    let mut server = spawn_server(&config_path).await;
    assert!(
        wait_for_server(port, 40).await,
        "Server did not start in time"
    );

    let response = Client::new()
        .get(format!("http://127.0.0.1:{}/api/v1/config", port))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let json: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(json["server"]["port"], port);
    assert_eq!(json["details"]["langs"][0], "en");
    assert!(json.get("tmdb").is_none());
    assert!(json.get("torrent").is_none());

    server.kill().await.ok();
}

#[tokio::test]
async fn test_torrent_section_enables_client() {
    let temp_dir = TempDir::new().unwrap();
    let port = get_available_port();
    let config_path = write_minimal_config(temp_dir.path(), port);
    let mut config = fs::read_to_string(&config_path).unwrap();
    config.push_str(
        r#"
[torrent]
url = "http://127.0.0.1:9"
username = "admin"
password = "hunter2"
"#,
    );
    fs::write(&config_path, config).unwrap();

    let mut server = spawn_server(&config_path).await;
    assert!(
        wait_for_server(port, 40).await,
        "Server did not start in time"
    );

    let client = Client::new();
    let status: serde_json::Value = client
        .get(format!("http://127.0.0.1:{}/api/v1/torrents/status", port))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse JSON");
    assert_eq!(status["backend"], "qbittorrent");
    assert_eq!(status["configured"], true);

    let config = client
        .get(format!("http://127.0.0.1:{}/api/v1/config", port))
        .send()
        .await
        .expect("Failed to send request")
        .text()
        .await
        .expect("Failed to read body");
    assert!(config.contains("password_configured"));
    assert!(!config.contains("hunter2"));

    server.kill().await.ok();
}

#[tokio::test]
async fn test_catalog_loaded_at_startup() {
    let temp_dir = TempDir::new().unwrap();
    let port = get_available_port();
    let config_path = write_minimal_config(temp_dir.path(), port);

    let mut server = spawn_server(&config_path).await;
    assert!(
        wait_for_server(port, 40).await,
        "Server did not start in time"
    );

    let json: serde_json::Value = Client::new()
        .get(format!("http://127.0.0.1:{}/api/v1/movies", port))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse JSON");
    assert_eq!(json["total"], 1);
    assert_eq!(json["movies"][0]["title"], "alien.mkv");
    assert_eq!(json["movies"][0]["drive"], "");

    server.kill().await.ok();
}

#[cfg(unix)]
#[tokio::test]
async fn test_sigterm_saves_catalog() {
    let temp_dir = TempDir::new().unwrap();
    let port = get_available_port();
    let config_path = write_minimal_config(temp_dir.path(), port);
    let catalog_path = temp_dir.path().join("catalog.json");

    let mut server = spawn_server(&config_path).await;
    assert!(
        wait_for_server(port, 40).await,
        "Server did not start in time"
    );
    let _ = fs::remove_file(&catalog_path);

    let pid = server.id().expect("Server has no pid");
    let status = std::process::Command::new("kill")
        .arg("-TERM")
        .arg(pid.to_string())
        .status()
        .expect("Failed to send SIGTERM");
    assert!(status.success());

    let exit = timeout(Duration::from_secs(5), server.wait())
        .await
        .expect("Server did not stop in time")
        .expect("Failed to wait for server");
    assert!(exit.success());

    let saved = fs::read_to_string(&catalog_path).expect("Catalog was not saved");
    assert!(saved.contains("alien.mkv"));
}

#[tokio::test]
async fn test_missing_config_file_exits_with_error() {
    let result = run_to_exit(Path::new("/nonexistent/config.toml")).await;

    assert!(!result.status.success());
}

#[tokio::test]
async fn test_invalid_port_exits_with_error() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_minimal_config(temp_dir.path(), 0);

    let result = run_to_exit(&config_path).await;

    assert!(!result.status.success());
}

#[tokio::test]
async fn test_malformed_catalog_exits_with_error() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = write_minimal_config(temp_dir.path(), get_available_port());
    fs::write(temp_dir.path().join("catalog.json"), "{ not json").unwrap();

    let result = run_to_exit(&config_path).await;

    assert!(!result.status.success());
}
