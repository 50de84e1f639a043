//! JSON-file backed movie catalog.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::index::SearchIndex;
use super::scanner::Scanner;
use super::store::{load_registry, save_registry};
use super::types::{
    file_available, CatalogError, CatalogStats, Movie, MovieId, MovieRecord, MovieUpdate,
    Registry, ScanReport,
};
use super::volumes::VolumeResolver;
use super::MovieCatalog;
use crate::config::Config;
use crate::metrics::{REFRESHES_TOTAL, REFRESH_DURATION};

/// Registry, index and tags served together; replaced as a unit on refresh.
#[derive(Default)]
struct CatalogState {
    registry: Registry,
    index: SearchIndex,
    /// Tags attached through `add_tag`, re-applied whenever the index is rebuilt.
    tags: BTreeMap<MovieId, BTreeSet<String>>,
    last_refresh: Option<DateTime<Utc>>,
}

/// Movie catalog persisted as a JSON document.
pub struct JsonCatalog {
    path: PathBuf,
    scanner: Scanner,
    state: RwLock<CatalogState>,
}

impl JsonCatalog {
    /// Create an empty catalog. Nothing is read until [`MovieCatalog::load`].
    pub fn new(path: impl Into<PathBuf>, scanner: Scanner) -> Self {
        Self {
            path: path.into(),
            scanner,
            state: RwLock::new(CatalogState::default()),
        }
    }

    /// Create a catalog from configuration and load it.
    pub fn open(config: &Config) -> Result<Self, CatalogError> {
        let resolver = VolumeResolver::from_config(&config.volumes);
        let scanner = Scanner::from_config(resolver, &config.catalog);
        let catalog = Self::new(config.catalog.path.clone(), scanner);
        catalog.load()?;
        Ok(catalog)
    }

    /// Location of the persisted document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> RwLockReadGuard<'_, CatalogState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CatalogState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reconcile `registry` and, only if that succeeds, install it with a
    /// freshly built index.
    fn install(
        &self,
        state: &mut CatalogState,
        mut registry: Registry,
    ) -> Result<ScanReport, CatalogError> {
        let start = Instant::now();
        let result = self.scanner.reconcile(&mut registry);
        REFRESH_DURATION.observe(start.elapsed().as_secs_f64());

        let report = match result {
            Ok(report) => report,
            Err(e) => {
                REFRESHES_TOTAL.with_label_values(&["error"]).inc();
                warn!("Catalog refresh failed, keeping previous state: {}", e);
                return Err(e);
            }
        };

        state.tags.retain(|id, _| registry.contains(*id));
        state.index = build_index(&registry, &state.tags);
        state.registry = registry;
        state.last_refresh = Some(Utc::now());
        REFRESHES_TOTAL.with_label_values(&["success"]).inc();
        Ok(report)
    }
}

fn build_index(registry: &Registry, tags: &BTreeMap<MovieId, BTreeSet<String>>) -> SearchIndex {
    let mut index = SearchIndex::from_records(registry.iter());
    for (id, tags) in tags {
        for tag in tags {
            index.add(tag, *id);
        }
    }
    index
}

fn annotate(records: Vec<MovieRecord>) -> Vec<Movie> {
    records
        .into_iter()
        .map(|record| {
            let available = file_available(&record.file);
            Movie { record, available }
        })
        .collect()
}

impl MovieCatalog for JsonCatalog {
    fn all(&self) -> Vec<Movie> {
        let records: Vec<MovieRecord> = self.read().registry.iter().cloned().collect();
        annotate(records)
    }

    fn find(&self, query: &str) -> Vec<Movie> {
        let records: Vec<MovieRecord> = {
            let state = self.read();
            state
                .index
                .find(query)
                .into_iter()
                .filter_map(|id| state.registry.get(id).cloned())
                .collect()
        };
        annotate(records)
    }

    fn get(&self, id: MovieId) -> Option<Movie> {
        let record = self.read().registry.get(id).cloned()?;
        Some(record.to_movie())
    }

    fn update(&self, update: MovieUpdate) -> Result<Movie, CatalogError> {
        let mut state = self.write();
        let movie = state
            .registry
            .get_mut(update.id)
            .ok_or(CatalogError::UnknownMovie(update.id))?;
        let previous = std::mem::replace(&mut movie.tmdb_id, update.tmdb_id);
        let updated = movie.clone();

        if let Err(e) = save_registry(&self.path, &state.registry) {
            if let Some(movie) = state.registry.get_mut(update.id) {
                movie.tmdb_id = previous;
            }
            return Err(e);
        }

        debug!("Updated movie {}: tmdb_id={:?}", update.id, update.tmdb_id);
        Ok(updated.to_movie())
    }

    fn add_tag(&self, tag: &str, id: MovieId) -> Result<(), CatalogError> {
        let mut state = self.write();
        if !state.registry.contains(id) {
            return Err(CatalogError::UnknownMovie(id));
        }
        state.index.add(tag, id);
        state
            .tags
            .entry(id)
            .or_default()
            .insert(tag.trim().to_lowercase());
        Ok(())
    }

    fn refresh(&self) -> Result<ScanReport, CatalogError> {
        let mut state = self.write();
        let working = state.registry.clone();
        self.install(&mut state, working)
    }

    fn load(&self) -> Result<ScanReport, CatalogError> {
        let mut state = self.write();
        let mut stored = load_registry(&self.path)?;
        stored.raise_high_water(state.registry.high_water());
        info!("Loaded {} movie(s) from {:?}", stored.len(), self.path);
        self.install(&mut state, stored)
    }

    fn save(&self) -> Result<(), CatalogError> {
        let state = self.write();
        save_registry(&self.path, &state.registry)
    }

    fn stats(&self) -> CatalogStats {
        let (records, last_refresh) = {
            let state = self.read();
            let records: Vec<MovieRecord> = state.registry.iter().cloned().collect();
            (records, state.last_refresh)
        };

        let mut movies_by_drive: BTreeMap<String, usize> = BTreeMap::new();
        for record in &records {
            *movies_by_drive.entry(record.drive.clone()).or_default() += 1;
        }
        let movies = annotate(records);

        CatalogStats {
            total_movies: movies.len(),
            available_movies: movies.iter().filter(|m| m.available).count(),
            movies_by_drive,
            last_refresh,
        }
    }
}
