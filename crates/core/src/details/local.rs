//! Details stored as JSON files next to the movies.

use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::info;

use super::types::{DetailsError, MovieDetails};

/// Name of the details file shared by all movies of a directory.
fn shared_file_name(lang: &str) -> String {
    format!("movie-details.{}.json", lang)
}

/// Details file dedicated to one movie: `<file>.<lang>.json`.
fn dedicated_file(movie: &Path, lang: &str) -> PathBuf {
    let mut name = OsString::from(movie.as_os_str());
    name.push(format!(".{}.json", lang));
    PathBuf::from(name)
}

/// Load local details for the movie at `movie` in `lang`.
///
/// The dedicated file wins over the directory's shared file.
pub fn load_local_details(movie: &Path, lang: &str) -> Result<MovieDetails, DetailsError> {
    let mut candidates = vec![dedicated_file(movie, lang)];
    if let Some(dir) = movie.parent() {
        candidates.push(dir.join(shared_file_name(lang)));
    }

    for candidate in candidates {
        if let Some(details) = read_details(&candidate)? {
            info!(
                "Found details for {:?} ({}) in {:?}",
                movie, lang, candidate
            );
            return Ok(details);
        }
    }

    Err(DetailsError::NotFound {
        file: movie.to_path_buf(),
        lang: lang.to_string(),
    })
}

fn read_details(path: &Path) -> Result<Option<MovieDetails>, DetailsError> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(DetailsError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_slice(&data)
        .map(Some)
        .map_err(|source| DetailsError::Decode {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_details(path: &Path, details: &MovieDetails) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, serde_json::to_vec(details).unwrap()).unwrap();
    }

    fn sample(overview: &str) -> MovieDetails {
        MovieDetails {
            original_title: "Back to the Future".to_string(),
            overview: overview.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_dedicated_file_name() {
        assert_eq!(
            dedicated_file(Path::new("/m/back to the future 1.avi"), "en"),
            PathBuf::from("/m/back to the future 1.avi.en.json")
        );
    }

    #[test]
    fn test_load_from_dedicated_file() {
        let dir = TempDir::new().unwrap();
        let movie = dir.path().join("back to the future/back to the future 1.avi");
        let details = sample("Marty McFly is accidentally sent back in time...");
        write_details(&dedicated_file(&movie, "en"), &details);

        assert_eq!(load_local_details(&movie, "en").unwrap(), details);
    }

    #[test]
    fn test_load_from_shared_file() {
        let dir = TempDir::new().unwrap();
        let movie = dir.path().join("back to the future/back to the future 1.avi");
        let details = sample("shared");
        write_details(&movie.parent().unwrap().join("movie-details.en.json"), &details);

        assert_eq!(load_local_details(&movie, "en").unwrap(), details);
    }

    #[test]
    fn test_dedicated_file_wins() {
        let dir = TempDir::new().unwrap();
        let movie = dir.path().join("bttf/bttf 1.avi");
        write_details(&movie.parent().unwrap().join("movie-details.en.json"), &sample("shared"));
        write_details(&dedicated_file(&movie, "en"), &sample("dedicated"));

        assert_eq!(load_local_details(&movie, "en").unwrap().overview, "dedicated");
    }

    #[test]
    fn test_missing_details_is_not_found() {
        let dir = TempDir::new().unwrap();
        let movie = dir.path().join("bttf/bttf 1.avi");

        let err = load_local_details(&movie, "en").unwrap_err();
        assert!(matches!(err, DetailsError::NotFound { .. }));
        assert_eq!(
            err.to_string(),
            format!("There is no details for movie {}, lang en", movie.display())
        );
    }

    #[test]
    fn test_other_language_is_not_found() {
        let dir = TempDir::new().unwrap();
        let movie = dir.path().join("bttf/bttf 1.avi");
        write_details(&dedicated_file(&movie, "en"), &sample("english"));

        assert!(matches!(
            load_local_details(&movie, "de"),
            Err(DetailsError::NotFound { .. })
        ));
    }

    #[test]
    fn test_malformed_details_is_decode_error() {
        let dir = TempDir::new().unwrap();
        let movie = dir.path().join("bttf 1.avi");
        fs::write(dedicated_file(&movie, "en"), b"{ not json").unwrap();

        assert!(matches!(
            load_local_details(&movie, "en"),
            Err(DetailsError::Decode { .. })
        ));
    }
}
