//! Movie catalog - the registry of media files found on attached volumes.
//!
//! A refresh resolves mounted volumes, reconciles the registry with the
//! configured directories and rebuilds the search index. Records whose file
//! is missing are only dropped when their volume is mounted; a missing file
//! on an unplugged drive cannot be verified and is kept.

mod index;
mod json;
mod scanner;
mod store;
mod types;
mod volumes;

pub use index::SearchIndex;
pub use json::JsonCatalog;
pub use scanner::Scanner;
pub use store::{load_registry, save_registry};
pub use types::*;
pub use volumes::{MountedVolumes, VolumeResolver};

/// Trait for movie catalog implementations.
pub trait MovieCatalog: Send + Sync {
    /// All movies, annotated with availability.
    fn all(&self) -> Vec<Movie>;

    /// Movies owning a title or tag token contained in `query`.
    fn find(&self, query: &str) -> Vec<Movie>;

    /// A single movie by id.
    fn get(&self, id: MovieId) -> Option<Movie>;

    /// Merge the mutable fields of `update` into the stored movie and persist.
    fn update(&self, update: MovieUpdate) -> Result<Movie, CatalogError>;

    /// Attach a search tag to a movie. Only the index changes.
    fn add_tag(&self, tag: &str, id: MovieId) -> Result<(), CatalogError>;

    /// Reconcile the current registry with the filesystem.
    fn refresh(&self) -> Result<ScanReport, CatalogError>;

    /// Re-read the persisted registry, then reconcile it.
    fn load(&self) -> Result<ScanReport, CatalogError>;

    /// Persist the current registry.
    fn save(&self) -> Result<(), CatalogError>;

    /// Catalog statistics.
    fn stats(&self) -> CatalogStats;
}
