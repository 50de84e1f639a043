//! TMDB (The Movie Database) API client.
//!
//! TMDB requires an API key for access. When a response reports the request
//! quota as exhausted, further requests wait until the advertised reset time.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, warn};

use super::types::{TmdbImages, TmdbMovie};
use super::{ExternalCatalog, ExternalCatalogError};
use crate::metrics::{EXTERNAL_SERVICE_DURATION, EXTERNAL_SERVICE_REQUESTS};

const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";
const REMAINING_HEADER: &str = "x-ratelimit-remaining";
const RESET_HEADER: &str = "x-ratelimit-reset";
/// Upper bound on result pages fetched for one search.
const MAX_SEARCH_PAGES: u32 = 5;

/// TMDB API client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbConfig {
    /// TMDB API key (required).
    pub api_key: String,
    /// Base URL (default: https://api.themoviedb.org/3).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Image base URL for posters. Fetched from TMDB when not set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base_url: Option<String>,
    /// Poster size used for thumbnails.
    #[serde(default = "default_poster_small")]
    pub poster_small: String,
    /// Poster size used for the details view.
    #[serde(default = "default_poster_large")]
    pub poster_large: String,
}

fn default_poster_small() -> String {
    "w92".to_string()
}

fn default_poster_large() -> String {
    "w500".to_string()
}

/// TMDB API client.
pub struct TmdbClient {
    client: Client,
    base_url: String,
    api_key: String,
    images: OnceCell<TmdbImages>,
    blocked_until: Mutex<Option<Instant>>,
}

impl TmdbClient {
    /// Create a new TMDB client.
    pub fn new(config: TmdbConfig) -> Result<Self, ExternalCatalogError> {
        if config.api_key.trim().is_empty() {
            return Err(ExternalCatalogError::NotConfigured(
                "TMDB API key is required".to_string(),
            ));
        }

        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        let base_url = config
            .base_url
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let images = match config.image_base_url {
            Some(base_url) => OnceCell::new_with(Some(TmdbImages {
                base_url,
                poster_sizes: vec![],
            })),
            None => OnceCell::new(),
        };

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key,
            images,
            blocked_until: Mutex::new(None),
        })
    }

    async fn request<T: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ExternalCatalogError> {
        let start = Instant::now();
        let result = self.send(path, query).await;

        EXTERNAL_SERVICE_DURATION
            .with_label_values(&["tmdb", operation])
            .observe(start.elapsed().as_secs_f64());
        let status = if result.is_ok() { "success" } else { "error" };
        EXTERNAL_SERVICE_REQUESTS
            .with_label_values(&["tmdb", operation, status])
            .inc();

        result
    }

    async fn send<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ExternalCatalogError> {
        // Held across the request so that a quota reported by one response
        // is honoured by the next caller.
        let mut blocked_until = self.blocked_until.lock().await;
        if let Some(until) = blocked_until.take() {
            let now = Instant::now();
            if until > now {
                debug!("TMDB quota exhausted, waiting {:?}", until - now);
                tokio::time::sleep(until - now).await;
            }
        }

        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(query)
            .send()
            .await?;

        if let Some(delay) = rate_limit_delay(response.headers(), chrono::Utc::now().timestamp())
        {
            *blocked_until = Some(Instant::now() + delay);
        }
        drop(blocked_until);

        let status = response.status();
        if status == 401 {
            return Err(ExternalCatalogError::NotConfigured(
                "Invalid TMDB API key".to_string(),
            ));
        }
        if status == 429 {
            return Err(ExternalCatalogError::RateLimitExceeded);
        }
        if status == 404 {
            return Err(ExternalCatalogError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExternalCatalogError::ApiError {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        response.json().await.map_err(|e| {
            ExternalCatalogError::ParseError(format!("Failed to parse {} response: {}", path, e))
        })
    }
}

#[async_trait]
impl ExternalCatalog for TmdbClient {
    async fn search_movies(
        &self,
        query: &str,
        lang: &str,
    ) -> Result<Vec<TmdbMovie>, ExternalCatalogError> {
        debug!("TMDB movie search: query='{}', lang={}", query, lang);

        let mut movies = Vec::new();
        let mut page = 1;
        loop {
            let result: TmdbSearchResponse = self
                .request(
                    "search_movies",
                    "/search/movie",
                    &[
                        ("query", query.to_string()),
                        ("language", lang.to_string()),
                        ("page", page.to_string()),
                    ],
                )
                .await?;

            movies.extend(result.results.into_iter().map(TmdbMovie::from));
            if page >= result.total_pages.min(MAX_SEARCH_PAGES) {
                break;
            }
            page += 1;
        }

        Ok(movies)
    }

    async fn get_movie(&self, tmdb_id: u32, lang: &str) -> Result<TmdbMovie, ExternalCatalogError> {
        debug!("TMDB get movie: id={}, lang={}", tmdb_id, lang);

        let details: TmdbMovieDetails = self
            .request(
                "get_movie",
                &format!("/movie/{}", tmdb_id),
                &[("language", lang.to_string())],
            )
            .await
            .map_err(|e| match e {
                ExternalCatalogError::NotFound(_) => {
                    ExternalCatalogError::NotFound(format!("Movie ID {}", tmdb_id))
                }
                other => other,
            })?;

        Ok(details.into())
    }

    async fn images(&self) -> Result<TmdbImages, ExternalCatalogError> {
        self.images
            .get_or_try_init(|| async {
                let config: TmdbConfiguration =
                    self.request("configuration", "/configuration", &[]).await?;
                Ok(config.images)
            })
            .await
            .cloned()
    }
}

/// How long to hold off further requests, if the response says the quota is
/// used up. `now` is the current unix time in seconds.
fn rate_limit_delay(headers: &HeaderMap, now: i64) -> Option<Duration> {
    let remaining = headers.get(REMAINING_HEADER)?.to_str().ok()?;
    if remaining.trim() != "0" {
        return None;
    }
    let reset: i64 = match headers.get(RESET_HEADER)?.to_str().ok()?.trim().parse() {
        Ok(reset) => reset,
        Err(_) => {
            warn!("Ignoring malformed {} header", RESET_HEADER);
            return None;
        }
    };
    let secs = (reset + 1 - now).max(0);
    Some(Duration::from_secs(secs as u64))
}

/// TMDB reports failures as `{"status_code": n, "status_message": "..."}`.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<TmdbErrorStatus>(body) {
        Ok(status) => format!("{} (code {})", status.status_message, status.status_code),
        Err(_) => body.to_string(),
    }
}

// ============================================================================
// TMDB API Response Types (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct TmdbSearchResponse {
    results: Vec<TmdbMovieResult>,
    #[serde(default)]
    total_pages: u32,
}

#[derive(Debug, Deserialize)]
struct TmdbMovieResult {
    id: u32,
    title: String,
    original_title: Option<String>,
    release_date: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    vote_average: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct TmdbMovieDetails {
    id: u32,
    title: String,
    original_title: Option<String>,
    tagline: Option<String>,
    release_date: Option<String>,
    runtime: Option<u32>,
    overview: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    #[serde(default)]
    genres: Vec<TmdbNamed>,
    #[serde(default)]
    production_companies: Vec<TmdbNamed>,
    #[serde(default)]
    production_countries: Vec<TmdbNamed>,
    #[serde(default)]
    budget: u64,
    #[serde(default)]
    revenue: u64,
    imdb_id: Option<String>,
    vote_average: Option<f32>,
}

/// Genre, company and country entries all carry a display name.
#[derive(Debug, Deserialize)]
struct TmdbNamed {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TmdbConfiguration {
    images: TmdbImages,
}

#[derive(Debug, Deserialize)]
struct TmdbErrorStatus {
    status_code: i64,
    status_message: String,
}

// ============================================================================
// Conversions
// ============================================================================

fn names(entries: Vec<TmdbNamed>) -> Vec<String> {
    entries.into_iter().map(|e| e.name).collect()
}

impl From<TmdbMovieResult> for TmdbMovie {
    fn from(r: TmdbMovieResult) -> Self {
        Self {
            id: r.id,
            title: r.title,
            original_title: r.original_title,
            release_date: r.release_date,
            overview: r.overview,
            poster_path: r.poster_path,
            backdrop_path: r.backdrop_path,
            vote_average: r.vote_average,
            ..Default::default()
        }
    }
}

impl From<TmdbMovieDetails> for TmdbMovie {
    fn from(d: TmdbMovieDetails) -> Self {
        Self {
            id: d.id,
            title: d.title,
            original_title: d.original_title,
            tagline: d.tagline.filter(|t| !t.is_empty()),
            release_date: d.release_date,
            runtime_minutes: d.runtime,
            overview: d.overview,
            poster_path: d.poster_path,
            backdrop_path: d.backdrop_path,
            genres: names(d.genres),
            companies: names(d.production_companies),
            countries: names(d.production_countries),
            budget: d.budget,
            revenue: d.revenue,
            imdb_id: d.imdb_id.filter(|id| !id.is_empty()),
            vote_average: d.vote_average,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_movie_result_conversion() {
        let result = TmdbMovieResult {
            id: 603,
            title: "The Matrix".to_string(),
            original_title: Some("The Matrix".to_string()),
            release_date: Some("1999-03-30".to_string()),
            overview: Some("A computer hacker...".to_string()),
            poster_path: Some("/poster.jpg".to_string()),
            backdrop_path: None,
            vote_average: Some(8.2),
        };

        let movie: TmdbMovie = result.into();
        assert_eq!(movie.id, 603);
        assert_eq!(movie.title, "The Matrix");
        assert_eq!(movie.year(), Some(1999));
        assert!(movie.runtime_minutes.is_none()); // Not in search results
        assert!(movie.genres.is_empty());
    }

    #[test]
    fn test_movie_details_parse_and_convert() {
        let body = r#"{
            "id": 105,
            "title": "Back to the Future",
            "original_title": "Back to the Future",
            "tagline": "",
            "release_date": "1985-07-03",
            "runtime": 116,
            "overview": "Marty McFly...",
            "poster_path": "/poster.jpg",
            "genres": [{"id": 12, "name": "Adventure"}, {"id": 35, "name": "Comedy"}],
            "production_companies": [{"id": 56, "name": "Amblin Entertainment", "origin_country": "US"}],
            "production_countries": [{"iso_3166_1": "US", "name": "United States of America"}],
            "budget": 19000000,
            "revenue": 381109762,
            "imdb_id": "tt0088763"
        }"#;

        let details: TmdbMovieDetails = serde_json::from_str(body).unwrap();
        let movie: TmdbMovie = details.into();

        assert_eq!(movie.runtime_minutes, Some(116));
        assert_eq!(movie.genres, vec!["Adventure", "Comedy"]);
        assert_eq!(movie.companies, vec!["Amblin Entertainment"]);
        assert_eq!(movie.countries, vec!["United States of America"]);
        assert_eq!(movie.budget, 19_000_000);
        assert_eq!(movie.imdb_id.as_deref(), Some("tt0088763"));
        assert!(movie.tagline.is_none());
    }

    #[test]
    fn test_search_response_without_total_pages() {
        let body = r#"{"page": 1, "results": []}"#;
        let response: TmdbSearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.total_pages, 0);
    }

    #[test]
    fn test_config_defaults_poster_sizes() {
        let config: TmdbConfig = toml::from_str(r#"api_key = "k""#).unwrap();
        assert_eq!(config.poster_small, "w92");
        assert_eq!(config.poster_large, "w500");
    }

    #[test]
    fn test_new_requires_api_key() {
        let config = TmdbConfig {
            api_key: " ".to_string(),
            base_url: None,
            image_base_url: None,
            poster_small: default_poster_small(),
            poster_large: default_poster_large(),
        };
        assert!(matches!(
            TmdbClient::new(config),
            Err(ExternalCatalogError::NotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn test_configured_image_base_skips_request() {
        let client = TmdbClient::new(TmdbConfig {
            api_key: "key".to_string(),
            base_url: Some("http://127.0.0.1:9".to_string()),
            image_base_url: Some("http://images/".to_string()),
            poster_small: default_poster_small(),
            poster_large: default_poster_large(),
        })
        .unwrap();

        let images = client.images().await.unwrap();
        assert_eq!(images.base_url, "http://images/");
    }

    #[test]
    fn test_rate_limit_delay() {
        let mut headers = HeaderMap::new();
        assert!(rate_limit_delay(&headers, 100).is_none());

        headers.insert(REMAINING_HEADER, HeaderValue::from_static("3"));
        headers.insert(RESET_HEADER, HeaderValue::from_static("110"));
        assert!(rate_limit_delay(&headers, 100).is_none());

        headers.insert(REMAINING_HEADER, HeaderValue::from_static("0"));
        assert_eq!(
            rate_limit_delay(&headers, 100),
            Some(Duration::from_secs(11))
        );
        assert_eq!(rate_limit_delay(&headers, 200), Some(Duration::ZERO));
    }

    #[test]
    fn test_error_message() {
        let body = r#"{"status_code": 7, "status_message": "Invalid API key"}"#;
        assert_eq!(error_message(body), "Invalid API key (code 7)");
        assert_eq!(error_message("oops"), "oops");
    }
}
