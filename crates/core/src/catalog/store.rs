//! JSON persistence of the registry.
//!
//! The document is a single object keyed by decimal movie id.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use tracing::debug;

use super::types::{CatalogError, MovieId, MovieRecord, Registry};

/// Load the registry stored at `path`. A missing file is an empty registry.
pub fn load_registry(path: &Path) -> Result<Registry, CatalogError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("Catalog file {:?} does not exist yet", path);
            return Ok(Registry::new());
        }
        Err(e) => return Err(CatalogError::io(path, e)),
    };

    let movies: BTreeMap<MovieId, MovieRecord> = serde_json::from_reader(BufReader::new(file))
        .map_err(|source| CatalogError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

    // The map key is authoritative for the id.
    let movies = movies
        .into_iter()
        .map(|(id, mut movie)| {
            movie.id = id;
            (id, movie)
        })
        .collect();

    Ok(Registry::from_movies(movies))
}

/// Write the registry to `path`, replacing any previous content.
pub fn save_registry(path: &Path, registry: &Registry) -> Result<(), CatalogError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| CatalogError::io(parent, e))?;
    }

    let file = File::create(path).map_err(|e| CatalogError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, registry.movies()).map_err(CatalogError::Encode)?;
    writer
        .write_all(b"\n")
        .and_then(|_| writer.flush())
        .map_err(|e| CatalogError::io(path, e))?;

    debug!("Saved {} movie(s) to {:?}", registry.len(), path);
    Ok(())
}
