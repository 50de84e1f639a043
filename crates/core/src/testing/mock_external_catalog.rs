//! Mock external catalog for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::fixtures::IMAGE_BASE_URL;
use crate::external_catalog::{ExternalCatalog, ExternalCatalogError, TmdbImages, TmdbMovie};

/// A recorded catalog query for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCatalogQuery {
    SearchMovies { query: String, lang: String },
    GetMovie { tmdb_id: u32, lang: String },
    Images,
}

/// Mock implementation of the ExternalCatalog trait.
///
/// Provides controllable behavior for testing:
/// - Return configurable movies
/// - Track queries for assertions
/// - Simulate failures
///
/// # Example
///
/// ```rust,ignore
/// use moviebox_core::testing::{MockExternalCatalog, fixtures};
///
/// let catalog = MockExternalCatalog::new();
/// catalog.add_movie(fixtures::tmdb_movie(603, "The Matrix", 1999)).await;
///
/// let results = catalog.search_movies("matrix", "en").await?;
/// assert_eq!(results.len(), 1);
/// ```
#[derive(Debug)]
pub struct MockExternalCatalog {
    /// TMDB movies by ID.
    movies: Arc<RwLock<HashMap<u32, TmdbMovie>>>,
    /// Recorded queries.
    queries: Arc<RwLock<Vec<RecordedCatalogQuery>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<ExternalCatalogError>>>,
}

impl Default for MockExternalCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExternalCatalog {
    /// Create a new empty mock external catalog.
    pub fn new() -> Self {
        Self {
            movies: Arc::new(RwLock::new(HashMap::new())),
            queries: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    // =========================================================================
    // Movie Configuration
    // =========================================================================

    /// Add a TMDB movie.
    pub async fn add_movie(&self, movie: TmdbMovie) {
        self.movies.write().await.insert(movie.id, movie);
    }

    /// Remove all movies.
    pub async fn clear_movies(&self) {
        self.movies.write().await.clear();
    }

    // =========================================================================
    // Query Recording
    // =========================================================================

    /// Get all recorded queries.
    pub async fn recorded_queries(&self) -> Vec<RecordedCatalogQuery> {
        self.queries.read().await.clone()
    }

    /// Number of `get_movie` calls made so far.
    pub async fn movie_requests(&self) -> usize {
        self.queries
            .read()
            .await
            .iter()
            .filter(|q| matches!(q, RecordedCatalogQuery::GetMovie { .. }))
            .count()
    }

    // =========================================================================
    // Error Injection
    // =========================================================================

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: ExternalCatalogError) {
        *self.next_error.write().await = Some(error);
    }

    async fn take_error(&self) -> Option<ExternalCatalogError> {
        self.next_error.write().await.take()
    }

    async fn record(&self, query: RecordedCatalogQuery) {
        self.queries.write().await.push(query);
    }
}

#[async_trait]
impl ExternalCatalog for MockExternalCatalog {
    async fn search_movies(
        &self,
        query: &str,
        lang: &str,
    ) -> Result<Vec<TmdbMovie>, ExternalCatalogError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        self.record(RecordedCatalogQuery::SearchMovies {
            query: query.to_string(),
            lang: lang.to_string(),
        })
        .await;

        let query_lower = query.to_lowercase();
        let results = self
            .movies
            .read()
            .await
            .values()
            .filter(|m| m.title.to_lowercase().contains(&query_lower))
            .cloned()
            .collect();

        Ok(results)
    }

    async fn get_movie(&self, tmdb_id: u32, lang: &str) -> Result<TmdbMovie, ExternalCatalogError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        self.record(RecordedCatalogQuery::GetMovie {
            tmdb_id,
            lang: lang.to_string(),
        })
        .await;

        self.movies
            .read()
            .await
            .get(&tmdb_id)
            .cloned()
            .ok_or_else(|| ExternalCatalogError::NotFound(format!("Movie ID {}", tmdb_id)))
    }

    async fn images(&self) -> Result<TmdbImages, ExternalCatalogError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        self.record(RecordedCatalogQuery::Images).await;

        Ok(TmdbImages {
            base_url: IMAGE_BASE_URL.to_string(),
            poster_sizes: vec!["w92".to_string(), "w500".to_string()],
        })
    }
}
