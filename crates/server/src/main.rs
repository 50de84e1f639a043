use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use moviebox_core::{
    load_config, validate_config, DetailsService, JsonCatalog, MovieCatalog, QBittorrentClient,
    TorrentClient,
};
use moviebox_server::{api::create_router, state::AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("MOVIEBOX_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("moviebox {} loading configuration from {:?}", VERSION, config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!("Configuration loaded successfully (hash {})", &config_hash[..16]);
    info!("Catalog file: {:?}", config.catalog.path);
    info!("Search directories: {:?}", config.catalog.dirs);

    // Load and reconcile the catalog
    let catalog_config = config.clone();
    let catalog = tokio::task::spawn_blocking(move || JsonCatalog::open(&catalog_config))
        .await
        .context("Catalog loader panicked")?
        .context("Failed to open catalog")?;
    let catalog: Arc<dyn MovieCatalog> = Arc::new(catalog);
    info!("Catalog initialized with {} movie(s)", catalog.stats().total_movies);

    // Details service, with TMDB when configured
    let details = Arc::new(
        DetailsService::from_config(&config, Arc::clone(&catalog))
            .context("Failed to create details service")?,
    );
    if details.has_tmdb() {
        info!("TMDB configured, warming up details in the background");
        let details = Arc::clone(&details);
        tokio::spawn(async move {
            details.warm_up().await;
        });
    } else {
        info!("TMDB not configured, using local details only");
    }

    // Periodic refresh
    let refresher = config
        .catalog
        .refresh_interval_secs
        .filter(|secs| *secs > 0)
        .map(|secs| spawn_refresher(Arc::clone(&catalog), Duration::from_secs(secs)));

    // Create app state
    let mut state = AppState::new(config.clone(), Arc::clone(&catalog), details);

    // Torrent client, when configured
    match &config.torrent {
        Some(torrent_config) => {
            let client: Arc<dyn TorrentClient> = Arc::new(
                QBittorrentClient::new(torrent_config.clone())
                    .context("Failed to create torrent client")?,
            );
            info!("Torrent client: {} at {}", client.name(), torrent_config.url);
            state = state.with_torrent_client(client);
        }
        None => info!("Torrent client not configured"),
    }
    let state = Arc::new(state);

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    if let Some(handle) = refresher {
        handle.abort();
    }

    // Persist the catalog
    tokio::task::spawn_blocking(move || catalog.save())
        .await
        .context("Catalog save panicked")?
        .context("Failed to save catalog")?;
    info!("Catalog saved");

    Ok(())
}

/// Refresh the catalog every `period`. Failures keep the previous catalog.
fn spawn_refresher(catalog: Arc<dyn MovieCatalog>, period: Duration) -> JoinHandle<()> {
    info!("Refreshing catalog every {:?}", period);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately and the catalog is fresh.
        interval.tick().await;
        loop {
            interval.tick().await;
            let catalog = Arc::clone(&catalog);
            match tokio::task::spawn_blocking(move || catalog.refresh()).await {
                Ok(Ok(report)) => info!(
                    "Periodic refresh: {} added, {} removed, {} total",
                    report.added, report.removed, report.total
                ),
                Ok(Err(e)) => warn!("Periodic refresh failed: {}", e),
                Err(e) => error!("Periodic refresh task failed: {}", e),
            }
        }
    })
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
