//! External movie metadata (TMDB).
//!
//! Used to enrich catalog entries that carry a TMDB id with details and
//! poster URLs, and to search for candidate ids.

mod tmdb;
mod types;

pub use tmdb::{TmdbClient, TmdbConfig};
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when interacting with external catalogs.
#[derive(Debug, Error)]
pub enum ExternalCatalogError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded, please wait before retrying")]
    RateLimitExceeded,

    /// Resource not found (404).
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Client not configured (missing API key, etc.).
    #[error("Client not configured: {0}")]
    NotConfigured(String),
}

/// Trait for movie metadata sources.
#[async_trait]
pub trait ExternalCatalog: Send + Sync {
    /// Search for movies by query, results in `lang`.
    async fn search_movies(
        &self,
        query: &str,
        lang: &str,
    ) -> Result<Vec<TmdbMovie>, ExternalCatalogError>;

    /// Get a specific movie by TMDB ID, in `lang`.
    async fn get_movie(&self, tmdb_id: u32, lang: &str) -> Result<TmdbMovie, ExternalCatalogError>;

    /// Image settings used to build poster URLs.
    async fn images(&self) -> Result<TmdbImages, ExternalCatalogError>;
}
