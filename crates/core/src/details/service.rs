//! Details lookup with caching and index enrichment.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use super::local::load_local_details;
use super::types::{DetailsError, MovieDetails};
use crate::cache::LoadingCache;
use crate::catalog::{Movie, MovieCatalog, MovieId};
use crate::config::Config;
use crate::external_catalog::{ExternalCatalog, ExternalCatalogError, TmdbClient};

/// TMDB provider plus the poster sizes to resolve.
struct TmdbSource {
    provider: Arc<dyn ExternalCatalog>,
    poster_small: String,
    poster_large: String,
}

impl TmdbSource {
    async fn fetch(&self, tmdb_id: u32, lang: &str) -> Result<MovieDetails, DetailsError> {
        let images = self.provider.images().await?;
        let movie = self.provider.get_movie(tmdb_id, lang).await?;
        info!("Found details for TMDB id {} ({}): {}", tmdb_id, lang, movie.title);
        Ok(MovieDetails::from_tmdb(
            movie,
            &images,
            &self.poster_small,
            &self.poster_large,
        ))
    }
}

/// Resolves movie details from TMDB (movies with a TMDB id, when configured)
/// or from local details files.
pub struct DetailsService {
    catalog: Arc<dyn MovieCatalog>,
    tmdb: Option<TmdbSource>,
    langs: Vec<String>,
    local_cache: LoadingCache<(PathBuf, String), MovieDetails>,
    tmdb_cache: LoadingCache<(u32, String), MovieDetails>,
}

impl DetailsService {
    /// Local files only. `langs` must not be empty; the first is the default.
    pub fn new(catalog: Arc<dyn MovieCatalog>, langs: Vec<String>) -> Self {
        let langs = if langs.is_empty() {
            vec!["en".to_string()]
        } else {
            langs
        };
        Self {
            catalog,
            tmdb: None,
            langs,
            local_cache: LoadingCache::new(),
            tmdb_cache: LoadingCache::new(),
        }
    }

    /// Use `provider` for movies that carry a TMDB id.
    pub fn with_tmdb(
        mut self,
        provider: Arc<dyn ExternalCatalog>,
        poster_small: impl Into<String>,
        poster_large: impl Into<String>,
    ) -> Self {
        self.tmdb = Some(TmdbSource {
            provider,
            poster_small: poster_small.into(),
            poster_large: poster_large.into(),
        });
        self
    }

    /// Build the service from configuration, with a TMDB client when the
    /// `[tmdb]` section is present.
    pub fn from_config(
        config: &Config,
        catalog: Arc<dyn MovieCatalog>,
    ) -> Result<Self, DetailsError> {
        let service = Self::new(catalog, config.details.langs.clone());
        match &config.tmdb {
            Some(tmdb) => {
                let client = TmdbClient::new(tmdb.clone())?;
                Ok(service.with_tmdb(
                    Arc::new(client),
                    tmdb.poster_small.clone(),
                    tmdb.poster_large.clone(),
                ))
            }
            None => Ok(service),
        }
    }

    pub fn has_tmdb(&self) -> bool {
        self.tmdb.is_some()
    }

    pub fn default_lang(&self) -> &str {
        &self.langs[0]
    }

    /// Details for `movie` in `lang` (the default language when `None`).
    ///
    /// Without `try_load` only cached details are returned. `Ok(None)` means
    /// no details are available. Languages other than the configured ones
    /// are rejected.
    pub async fn movie_details(
        &self,
        movie: &Movie,
        lang: Option<&str>,
        try_load: bool,
    ) -> Result<Option<MovieDetails>, DetailsError> {
        let lang = self.resolve_lang(lang)?;
        let id = movie.id();

        let result = match (movie.record.tmdb_id, &self.tmdb) {
            (Some(tmdb_id), Some(source)) => {
                let key = (tmdb_id, lang);
                if !try_load {
                    return Ok(self.tmdb_cache.get(&key));
                }
                self.tmdb_cache
                    .get_or_load(key, |(tmdb_id, lang)| async move {
                        let details = source.fetch(tmdb_id, &lang).await?;
                        self.index_details(id, &details).await;
                        Ok::<_, DetailsError>(details)
                    })
                    .await
            }
            _ => {
                let key = (movie.file().to_path_buf(), lang);
                if !try_load {
                    return Ok(self.local_cache.get(&key));
                }
                self.local_cache
                    .get_or_load(key, |(file, lang)| async move {
                        let details =
                            tokio::task::spawn_blocking(move || load_local_details(&file, &lang))
                                .await??;
                        self.index_details(id, &details).await;
                        Ok::<_, DetailsError>(details)
                    })
                    .await
            }
        };

        match result {
            Ok(details) => Ok(Some(details)),
            Err(e) if is_not_found(&e) => {
                debug!("No details for movie {}: {}", id, e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// The configured language matching `lang`, or the default one.
    fn resolve_lang(&self, lang: Option<&str>) -> Result<String, DetailsError> {
        let Some(lang) = lang.map(str::trim) else {
            return Ok(self.default_lang().to_string());
        };
        self.langs
            .iter()
            .find(|l| l.eq_ignore_ascii_case(lang))
            .cloned()
            .ok_or_else(|| DetailsError::UnsupportedLanguage(lang.to_string()))
    }

    /// Search TMDB for movies matching `query`. Empty when TMDB is not
    /// configured.
    pub async fn search(
        &self,
        query: &str,
        lang: Option<&str>,
    ) -> Result<Vec<MovieDetails>, DetailsError> {
        let lang = self.resolve_lang(lang)?;
        let Some(source) = &self.tmdb else {
            return Ok(Vec::new());
        };

        let images = source.provider.images().await?;
        let movies = source.provider.search_movies(query, &lang).await?;
        Ok(movies
            .into_iter()
            .map(|m| {
                MovieDetails::from_tmdb(m, &images, &source.poster_small, &source.poster_large)
            })
            .collect())
    }

    /// Load TMDB details of every catalogued movie with a TMDB id, in every
    /// configured language. Returns the number of successful loads.
    pub async fn warm_up(&self) -> usize {
        if self.tmdb.is_none() {
            return 0;
        }

        let start = Instant::now();
        let movies: Vec<Movie> = self
            .catalog
            .all()
            .into_iter()
            .filter(|m| m.record.tmdb_id.is_some())
            .collect();
        info!("Loading TMDB details for {} movie(s)", movies.len());

        let mut loaded = 0;
        for movie in &movies {
            for lang in &self.langs {
                match self.movie_details(movie, Some(lang), true).await {
                    Ok(Some(_)) => loaded += 1,
                    Ok(None) => {}
                    Err(e) => warn!("Failed to load details for movie {}: {}", movie.id(), e),
                }
            }
        }

        info!(
            "Loaded {} TMDB detail record(s) in {:?}",
            loaded,
            start.elapsed()
        );
        loaded
    }

    /// Number of cached detail records.
    pub fn cached(&self) -> usize {
        self.local_cache.len() + self.tmdb_cache.len()
    }

    /// Feed genres and titles of freshly loaded details into the catalog
    /// index. Tags survive refreshes, so cached details are not re-indexed.
    async fn index_details(&self, id: MovieId, details: &MovieDetails) {
        let catalog = Arc::clone(&self.catalog);
        let tags: Vec<String> = details.tags().into_iter().map(str::to_string).collect();
        let result = tokio::task::spawn_blocking(move || {
            tags.iter().try_for_each(|tag| catalog.add_tag(tag, id))
        })
        .await;

        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("Not tagging movie {}: {}", id, e),
            Err(e) => warn!("Tagging movie {} failed: {}", id, e),
        }
    }
}

fn is_not_found(e: &DetailsError) -> bool {
    matches!(
        e,
        DetailsError::NotFound { .. } | DetailsError::External(ExternalCatalogError::NotFound(_))
    )
}
