//! Reconciliation of the registry against the filesystem.

use std::collections::HashSet;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::types::{CatalogError, MovieRecord, Registry, ScanReport};
use super::volumes::{MountedVolumes, VolumeResolver};
use crate::config::CatalogConfig;
use crate::metrics::{MOVIES_ADDED, MOVIES_REMOVED};

/// Walks the configured directories and reconciles a registry with what it finds.
#[derive(Debug, Clone)]
pub struct Scanner {
    resolver: VolumeResolver,
    dirs: Vec<PathBuf>,
    extensions: Vec<String>,
}

impl Scanner {
    /// Create a scanner. Extensions may be given with or without the leading dot.
    ///
    /// Relative directories are resolved against the current directory.
    pub fn new(resolver: VolumeResolver, dirs: Vec<PathBuf>, extensions: &[String]) -> Self {
        let dirs = dirs.iter().map(|d| absolute_dir(d)).collect();
        let extensions = extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        Self {
            resolver,
            dirs,
            extensions,
        }
    }

    pub fn from_config(resolver: VolumeResolver, config: &CatalogConfig) -> Self {
        Self::new(resolver, config.dirs.clone(), &config.video_file_exts)
    }

    /// Reconcile `registry` in place: drop records whose file is gone from a
    /// mounted volume, then add files not yet known.
    pub fn reconcile(&self, registry: &mut Registry) -> Result<ScanReport, CatalogError> {
        let volumes = self.resolver.resolve()?;
        let mut report = ScanReport {
            mounted_volumes: volumes.len(),
            ..ScanReport::default()
        };

        let known = self.prune(registry, &volumes, &mut report);
        self.discover(registry, &volumes, &known, &mut report)?;

        report.total = registry.len();
        info!(
            "Reconciled catalog: {} added, {} removed, {} unverified, {} total",
            report.added, report.removed, report.unverified, report.total
        );
        MOVIES_ADDED.inc_by(report.added as u64);
        MOVIES_REMOVED.inc_by(report.removed as u64);
        Ok(report)
    }

    /// Remove entries whose file is missing from a mounted drive. Returns the
    /// paths of every entry kept.
    fn prune(
        &self,
        registry: &mut Registry,
        volumes: &MountedVolumes,
        report: &mut ScanReport,
    ) -> HashSet<PathBuf> {
        let mut known = HashSet::with_capacity(registry.len());
        let mut doomed = Vec::new();

        let ids: Vec<_> = registry.movies().keys().copied().collect();
        for id in ids {
            let Some(movie) = registry.get_mut(id) else {
                continue;
            };
            match movie.file.try_exists() {
                Ok(true) => {
                    if let Some(volume) = volumes.volume_for(&movie.file) {
                        if volume.name != movie.drive {
                            debug!(
                                "Movie {} moved from drive '{}' to '{}'",
                                id, movie.drive, volume.name
                            );
                            movie.drive = volume.name.clone();
                        }
                    }
                    known.insert(movie.file.clone());
                }
                Ok(false) if volumes.is_mounted(&movie.drive) => {
                    debug!("Removing {:?} from catalog, file is gone", movie.file);
                    doomed.push(id);
                }
                Ok(false) => {
                    debug!(
                        "Keeping {:?}, drive '{}' is not mounted",
                        movie.file, movie.drive
                    );
                    report.unverified += 1;
                    known.insert(movie.file.clone());
                }
                Err(e) => {
                    warn!("Cannot check {:?}, keeping it: {}", movie.file, e);
                    report.unverified += 1;
                    known.insert(movie.file.clone());
                }
            }
        }

        for id in doomed {
            registry.remove(id);
            report.removed += 1;
        }
        known
    }

    /// Walk every configured directory and register matching files not in `known`.
    fn discover(
        &self,
        registry: &mut Registry,
        volumes: &MountedVolumes,
        known: &HashSet<PathBuf>,
        report: &mut ScanReport,
    ) -> Result<(), CatalogError> {
        let mut ids = registry.id_generator();

        for dir in &self.dirs {
            match dir.try_exists() {
                Ok(true) => {}
                Ok(false) => {
                    debug!("Skipping missing directory {:?}", dir);
                    continue;
                }
                Err(e) => return Err(CatalogError::io(dir, e)),
            }

            let walker = WalkDir::new(dir)
                .follow_links(false)
                .sort_by_file_name();
            for entry in walker {
                let entry = entry.map_err(|e| walk_error(dir, e))?;
                if !entry.file_type().is_file() || !self.accepts(entry.path()) {
                    continue;
                }
                if known.contains(entry.path()) {
                    continue;
                }

                let path = entry.into_path();
                let drive = volumes
                    .volume_for(&path)
                    .map(|v| v.name.clone())
                    .unwrap_or_default();
                let record = MovieRecord::new(ids.next_id(), path, drive);
                debug!("Adding {:?} to catalog as {}", record.file, record.id);
                registry.insert(record);
                report.added += 1;
            }
        }
        Ok(())
    }

    /// Whether the file extension is in the allow-list (ASCII case-insensitive).
    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|a| a.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    }
}

/// Absolute, lexically normalized form of `dir`. Symlinks are left alone.
fn absolute_dir(dir: &Path) -> PathBuf {
    let absolute = match std::path::absolute(dir) {
        Ok(path) => path,
        Err(e) => {
            warn!("Cannot resolve search directory {:?}: {}", dir, e);
            return dir.to_path_buf();
        }
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

fn walk_error(dir: &Path, e: walkdir::Error) -> CatalogError {
    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf());
    let source = e
        .into_io_error()
        .unwrap_or_else(|| io::Error::other("filesystem loop detected"));
    CatalogError::io(path, source)
}
