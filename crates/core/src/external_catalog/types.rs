//! Types for external catalog API responses.

use serde::{Deserialize, Serialize};

/// A TMDB movie.
///
/// Search results only carry the summary fields; the remaining fields are
/// filled when the movie is fetched by id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TmdbMovie {
    /// TMDB movie ID.
    pub id: u32,
    /// Movie title (in the requested language).
    pub title: String,
    /// Original title (in original language).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tagline: Option<String>,
    /// Release date (YYYY-MM-DD).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    /// Runtime in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_minutes: Option<u32>,
    /// Movie overview/synopsis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    /// Poster path (relative to TMDB image base URL).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_path: Option<String>,
    /// Backdrop path (relative to TMDB image base URL).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backdrop_path: Option<String>,
    /// Genre names.
    #[serde(default)]
    pub genres: Vec<String>,
    /// Production company names.
    #[serde(default)]
    pub companies: Vec<String>,
    /// Production country names.
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default)]
    pub budget: u64,
    #[serde(default)]
    pub revenue: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
    /// Average vote (0-10).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_average: Option<f32>,
}

impl TmdbMovie {
    /// Get the release year from the release date.
    pub fn year(&self) -> Option<u32> {
        self.release_date
            .as_ref()
            .and_then(|d| d.split('-').next())
            .and_then(|y| y.parse().ok())
    }
}

/// Image settings returned by the TMDB configuration endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TmdbImages {
    /// Base URL that image sizes and paths are appended to.
    pub base_url: String,
    #[serde(default)]
    pub poster_sizes: Vec<String>,
}

impl TmdbImages {
    /// Full URL of `path` at the given size, e.g. `w92`.
    pub fn url(&self, size: &str, path: &str) -> String {
        format!("{}{}{}", self.base_url, size, path)
    }
}
