//! Types for the movie catalog.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Registry identifier of a movie.
pub type MovieId = u64;

/// A movie as stored in the registry and in the persisted document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieRecord {
    pub id: MovieId,
    /// Display name; the file base name unless changed.
    pub title: String,
    /// Absolute path as last observed.
    #[serde(rename = "file", alias = "path")]
    pub file: PathBuf,
    /// Stable identifier of the volume the file was last seen on.
    #[serde(default)]
    pub drive: String,
    /// TMDB id, set by explicit update only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmdb_id: Option<u32>,
}

impl MovieRecord {
    /// Create a record for a newly discovered file.
    pub fn new(id: MovieId, file: PathBuf, drive: impl Into<String>) -> Self {
        let title = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.display().to_string());
        Self {
            id,
            title,
            file,
            drive: drive.into(),
            tmdb_id: None,
        }
    }

    /// Annotate the record with live availability.
    pub fn to_movie(&self) -> Movie {
        Movie {
            record: self.clone(),
            available: file_available(&self.file),
        }
    }
}

/// A movie as returned to callers: the record plus its availability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Movie {
    #[serde(flatten)]
    pub record: MovieRecord,
    /// Whether the file currently resolves on disk. Never persisted.
    pub available: bool,
}

impl Movie {
    pub fn id(&self) -> MovieId {
        self.record.id
    }

    pub fn title(&self) -> &str {
        &self.record.title
    }

    pub fn file(&self) -> &Path {
        &self.record.file
    }
}

/// Mutable fields accepted by [`MovieCatalog::update`](super::MovieCatalog::update).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieUpdate {
    pub id: MovieId,
    #[serde(default)]
    pub tmdb_id: Option<u32>,
}

/// The in-memory registry: records by id plus the id high-water mark.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    movies: BTreeMap<MovieId, MovieRecord>,
    high_water: MovieId,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from persisted records; the high-water mark starts at the max id.
    pub fn from_movies(movies: BTreeMap<MovieId, MovieRecord>) -> Self {
        let high_water = movies.keys().next_back().copied().unwrap_or(0);
        Self { movies, high_water }
    }

    pub fn movies(&self) -> &BTreeMap<MovieId, MovieRecord> {
        &self.movies
    }

    pub fn get(&self, id: MovieId) -> Option<&MovieRecord> {
        self.movies.get(&id)
    }

    pub fn get_mut(&mut self, id: MovieId) -> Option<&mut MovieRecord> {
        self.movies.get_mut(&id)
    }

    pub fn contains(&self, id: MovieId) -> bool {
        self.movies.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MovieRecord> {
        self.movies.values()
    }

    /// Highest id this registry has ever held.
    pub fn high_water(&self) -> MovieId {
        self.high_water
    }

    /// Insert a record, raising the high-water mark if needed.
    pub fn insert(&mut self, record: MovieRecord) {
        self.high_water = self.high_water.max(record.id);
        self.movies.insert(record.id, record);
    }

    /// Never lower the high-water mark, e.g. when replacing an in-memory
    /// registry with one read from disk.
    pub fn raise_high_water(&mut self, id: MovieId) {
        self.high_water = self.high_water.max(id);
    }

    pub fn remove(&mut self, id: MovieId) -> Option<MovieRecord> {
        self.movies.remove(&id)
    }

    /// Ids are handed out above the high-water mark so removed ids are never reused.
    pub fn id_generator(&self) -> IdGenerator {
        IdGenerator {
            last: self.high_water,
        }
    }
}

/// Sequential id source for one reconciliation pass.
#[derive(Debug)]
pub struct IdGenerator {
    last: MovieId,
}

impl IdGenerator {
    pub fn next_id(&mut self) -> MovieId {
        self.last += 1;
        self.last
    }
}

/// A mounted storage volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Volume {
    /// Kernel device name, e.g. `sda1`.
    pub device: String,
    /// Label, or the by-id name when the device has no label.
    pub name: String,
    pub mount_point: PathBuf,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub added: usize,
    pub removed: usize,
    /// Records whose file is missing on a volume that is not mounted.
    pub unverified: usize,
    pub total: usize,
    pub mounted_volumes: usize,
}

/// Catalog statistics.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogStats {
    pub total_movies: usize,
    pub available_movies: usize,
    /// Movie count per drive name (empty name for fixed roots).
    pub movies_by_drive: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_refresh: Option<DateTime<Utc>>,
}

/// Errors for catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode catalog {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode catalog: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Unknown movie, id: {0}")]
    UnknownMovie(MovieId),
}

impl CatalogError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Whether a path currently resolves on disk. Errors count as unavailable.
pub fn file_available(path: &Path) -> bool {
    path.try_exists().unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: MovieId, file: &str) -> MovieRecord {
        MovieRecord::new(id, PathBuf::from(file), "wd640")
    }

    #[test]
    fn test_new_record_title_is_base_name() {
        let r = record(1, "/media/pi/wd640/movies/gladiator.mkv");
        assert_eq!(r.title, "gladiator.mkv");
        assert_eq!(r.drive, "wd640");
        assert!(r.tmdb_id.is_none());
    }

    #[test]
    fn test_record_serialization_uses_file_key() {
        let mut r = record(3, "/media/x.mkv");
        r.tmdb_id = Some(101);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["file"], "/media/x.mkv");
        assert_eq!(json["drive"], "wd640");
        assert_eq!(json["tmdb_id"], 101);
        assert!(json.get("available").is_none());
    }

    #[test]
    fn test_record_deserialization_accepts_path_alias() {
        let json = r#"{"id": 7, "title": "x.mkv", "path": "/media/x.mkv", "drive": "wd640"}"#;
        let r: MovieRecord = serde_json::from_str(json).unwrap();
        assert_eq!(r.file, PathBuf::from("/media/x.mkv"));
        assert!(r.tmdb_id.is_none());
    }

    #[test]
    fn test_movie_serialization_flattens_record() {
        let movie = Movie {
            record: record(1, "/media/x.mkv"),
            available: false,
        };
        let json = serde_json::to_value(&movie).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["available"], false);
        assert!(json.get("tmdb_id").is_none());
    }

    #[test]
    fn test_id_generator_starts_above_high_water() {
        let mut registry = Registry::new();
        registry.insert(record(4, "/a.mkv"));
        registry.insert(record(9, "/b.mkv"));
        registry.remove(9);

        let mut ids = registry.id_generator();
        assert_eq!(ids.next_id(), 10);
        assert_eq!(ids.next_id(), 11);
    }

    #[test]
    fn test_registry_from_movies_sets_high_water() {
        let mut movies = BTreeMap::new();
        movies.insert(2, record(2, "/a.mkv"));
        movies.insert(5, record(5, "/b.mkv"));
        let registry = Registry::from_movies(movies);
        assert_eq!(registry.high_water(), 5);
        assert_eq!(Registry::new().id_generator().next_id(), 1);
    }

    #[test]
    fn test_raise_high_water_never_lowers() {
        let mut registry = Registry::new();
        registry.insert(record(3, "/a.mkv"));
        registry.raise_high_water(7);
        registry.raise_high_water(5);
        assert_eq!(registry.high_water(), 7);
        assert_eq!(registry.id_generator().next_id(), 8);
    }

    #[test]
    fn test_unknown_movie_error_message() {
        let err = CatalogError::UnknownMovie(3);
        assert_eq!(err.to_string(), "Unknown movie, id: 3");
    }
}
