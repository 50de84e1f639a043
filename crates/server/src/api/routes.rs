use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::{catalog, handlers, middleware::metrics_middleware, movies, torrents};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health, config and metrics
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/metrics", get(handlers::get_metrics))
        // Movies
        .route("/movies", get(movies::list_movies))
        .route(
            "/movies/{id}",
            get(movies::get_movie).put(movies::update_movie),
        )
        .route("/movies/{id}/tags", post(movies::add_tag))
        .route("/movies/{id}/details", get(movies::get_movie_details))
        .route("/details/search", get(movies::search_details))
        // Catalog maintenance
        .route("/catalog/stats", get(catalog::get_stats))
        .route("/catalog/refresh", post(catalog::refresh))
        .route("/catalog/save", post(catalog::save))
        // Torrent downloads
        .route("/torrents/status", get(torrents::get_status))
        .route("/torrents", get(torrents::list_torrents))
        .route("/torrents/add/url", post(torrents::add_from_url))
        .route("/torrents/add/file", post(torrents::add_file))
        .route(
            "/torrents/{hash}",
            get(torrents::get_torrent).delete(torrents::remove_torrent),
        )
        .route("/torrents/{hash}/files", get(torrents::list_files))
        .route("/torrents/{hash}/start", post(torrents::start_torrent))
        .route("/torrents/{hash}/stop", post(torrents::stop_torrent))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(metrics_middleware)),
        )
}
