use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - At least one video file extension is accepted
/// - Search directories are not blank
/// - TMDB API key is set when the section is present
/// - Torrent client URL and timeout are set when the section is present
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.catalog.video_file_exts.is_empty() {
        return Err(ConfigError::ValidationError(
            "catalog.video_file_exts must list at least one extension".to_string(),
        ));
    }

    if config
        .catalog
        .dirs
        .iter()
        .any(|d| d.as_os_str().is_empty())
    {
        return Err(ConfigError::ValidationError(
            "catalog.dirs cannot contain empty paths".to_string(),
        ));
    }

    if let Some(tmdb) = &config.tmdb {
        if tmdb.api_key.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "tmdb.api_key cannot be empty".to_string(),
            ));
        }
    }

    if let Some(torrent) = &config.torrent {
        if torrent.url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "torrent.url cannot be empty".to_string(),
            ));
        }
        if torrent.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "torrent.timeout_secs cannot be 0".to_string(),
            ));
        }
    }

    Ok(())
}
