//! Movie API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use moviebox_core::{Movie, MovieDetails, MovieId, MovieUpdate};

use super::{blocking, details_error, error_response, ApiError, SuccessResponse};
use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct MovieQueryParams {
    #[serde(default)]
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MovieListResponse {
    pub movies: Vec<Movie>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMovieRequest {
    #[serde(default)]
    pub tmdb_id: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct AddTagRequest {
    pub tag: String,
}

#[derive(Debug, Deserialize)]
pub struct DetailsQueryParams {
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default = "default_load")]
    pub load: bool,
}

fn default_load() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct DetailsSearchParams {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub lang: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DetailsSearchResponse {
    pub results: Vec<MovieDetails>,
    pub total: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/movies
///
/// List all movies, or those matching `q`, sorted by title.
pub async fn list_movies(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MovieQueryParams>,
) -> Result<Json<MovieListResponse>, ApiError> {
    let catalog = Arc::clone(state.catalog());
    let query = params
        .q
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty());

    let mut movies = blocking(move || {
        Ok(match query {
            Some(q) => catalog.find(&q),
            None => catalog.all(),
        })
    })
    .await?;
    movies.sort_by(|a, b| {
        a.title()
            .to_lowercase()
            .cmp(&b.title().to_lowercase())
            .then(a.id().cmp(&b.id()))
    });

    let total = movies.len();
    Ok(Json(MovieListResponse { movies, total }))
}

/// GET /api/v1/movies/{id}
pub async fn get_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<MovieId>,
) -> Result<Json<Movie>, ApiError> {
    find_movie(&state, id).await.map(Json)
}

/// PUT /api/v1/movies/{id}
///
/// Set or clear the TMDB id. The catalog is persisted immediately.
pub async fn update_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<MovieId>,
    Json(request): Json<UpdateMovieRequest>,
) -> Result<Json<Movie>, ApiError> {
    let catalog = Arc::clone(state.catalog());
    let update = MovieUpdate {
        id,
        tmdb_id: request.tmdb_id,
    };
    let movie = blocking(move || catalog.update(update)).await?;
    Ok(Json(movie))
}

/// POST /api/v1/movies/{id}/tags
pub async fn add_tag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<MovieId>,
    Json(request): Json<AddTagRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let tag = request.tag.trim();
    if tag.is_empty() {
        return Err(error_response(StatusCode::BAD_REQUEST, "Tag cannot be empty"));
    }

    let message = format!("Tagged movie {} with '{}'", id, tag);
    let tag = tag.to_string();
    let catalog = Arc::clone(state.catalog());
    blocking(move || catalog.add_tag(&tag, id)).await?;
    Ok(Json(SuccessResponse { message }))
}

/// GET /api/v1/movies/{id}/details
///
/// With `load=false` only already cached details are returned.
pub async fn get_movie_details(
    State(state): State<Arc<AppState>>,
    Path(id): Path<MovieId>,
    Query(params): Query<DetailsQueryParams>,
) -> Result<Json<MovieDetails>, ApiError> {
    let movie = find_movie(&state, id).await?;

    let details = state
        .details()
        .movie_details(&movie, params.lang.as_deref(), params.load)
        .await
        .map_err(details_error)?;

    match details {
        Some(details) => Ok(Json(details)),
        None => Err(error_response(
            StatusCode::NOT_FOUND,
            format!("No details for movie {}", id),
        )),
    }
}

/// GET /api/v1/details/search
///
/// Search TMDB for candidate details, e.g. to pick a TMDB id for a movie.
pub async fn search_details(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DetailsSearchParams>,
) -> Result<Json<DetailsSearchResponse>, ApiError> {
    let query = params.q.as_deref().map(str::trim).unwrap_or_default();
    if query.is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "Query parameter 'q' is required",
        ));
    }

    let results = state
        .details()
        .search(query, params.lang.as_deref())
        .await
        .map_err(details_error)?;

    let total = results.len();
    Ok(Json(DetailsSearchResponse { results, total }))
}

/// Look up a movie off the async runtime. Unknown ids are 404.
async fn find_movie(state: &AppState, id: MovieId) -> Result<Movie, ApiError> {
    let catalog = Arc::clone(state.catalog());
    blocking(move || Ok(catalog.get(id)))
        .await?
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, format!("Movie not found: {}", id)))
}
