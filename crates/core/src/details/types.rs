//! Types for movie details.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::external_catalog::{ExternalCatalogError, TmdbImages, TmdbMovie};

/// Descriptive information about a movie, from a local file or TMDB.
///
/// Local details files may use either `snake_case` or `camelCase` keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieDetails {
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "originalTitle")]
    pub original_title: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub companies: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub countries: Vec<String>,
    #[serde(default, alias = "releaseDate")]
    pub release_date: String,
    /// Runtime in minutes.
    #[serde(default)]
    pub runtime: u32,
    #[serde(default)]
    pub budget: u64,
    #[serde(default)]
    pub revenue: u64,
    #[serde(default)]
    pub tagline: String,
    #[serde(default, alias = "posterSmallUrl")]
    pub poster_small_url: String,
    #[serde(default, alias = "posterLargeUrl")]
    pub poster_large_url: String,
    #[serde(default, alias = "tmdbId", skip_serializing_if = "Option::is_none")]
    pub tmdb_id: Option<u32>,
    #[serde(default, alias = "imdbId")]
    pub imdb_id: String,
}

impl MovieDetails {
    /// Build details from a TMDB movie, resolving poster URLs at the given
    /// sizes.
    pub fn from_tmdb(movie: TmdbMovie, images: &TmdbImages, small: &str, large: &str) -> Self {
        let (poster_small_url, poster_large_url) = match &movie.poster_path {
            Some(path) if !path.is_empty() => (images.url(small, path), images.url(large, path)),
            _ => (String::new(), String::new()),
        };

        Self {
            title: movie.title,
            original_title: movie.original_title.unwrap_or_default(),
            overview: movie.overview.unwrap_or_default(),
            genres: movie.genres,
            companies: movie.companies,
            countries: movie.countries,
            release_date: movie.release_date.unwrap_or_default(),
            runtime: movie.runtime_minutes.unwrap_or_default(),
            budget: movie.budget,
            revenue: movie.revenue,
            tagline: movie.tagline.unwrap_or_default(),
            poster_small_url,
            poster_large_url,
            tmdb_id: Some(movie.id),
            imdb_id: movie.imdb_id.unwrap_or_default(),
        }
    }

    /// Search tokens this movie contributes to the catalog index.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.genres.iter().map(String::as_str).collect();
        tags.push(&self.original_title);
        tags.push(&self.title);
        tags.retain(|t| !t.trim().is_empty());
        tags
    }
}

/// Errors for details lookups.
#[derive(Debug, Error)]
pub enum DetailsError {
    #[error("There is no details for movie {file}, lang {lang}")]
    NotFound { file: PathBuf, lang: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode details {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error(transparent)]
    External(#[from] ExternalCatalogError),

    #[error("Details task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
