//! Default values for all configuration settings and the
//! `ConfigFile::default()` implementation.

use std::path::PathBuf;

use super::file::config_directory;
use super::settings::*;
use crate::cache::{
    DEFAULT_EVICTION_BATCH_SIZE, DEFAULT_MAX_CACHE_SIZE, DEFAULT_OFFLINE_TILE_COUNT_LIMIT,
};

/// Database file name inside the cache directory.
pub const DEFAULT_CACHE_FILE_NAME: &str = "cache.db";

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "tilestash.log";

/// Default database path: `<platform cache dir>/tilestash/cache.db`.
pub fn default_cache_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tilestash")
        .join(DEFAULT_CACHE_FILE_NAME)
}

/// Default log directory: `~/.tilestash/logs`.
pub fn default_log_directory() -> PathBuf {
    config_directory().join("logs")
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            cache: CacheSettings {
                path: default_cache_path(),
                max_size: DEFAULT_MAX_CACHE_SIZE,
                in_memory: false,
            },
            offline: OfflineSettings {
                tile_count_limit: DEFAULT_OFFLINE_TILE_COUNT_LIMIT,
                eviction_batch_size: DEFAULT_EVICTION_BATCH_SIZE,
            },
            logging: LoggingSettings {
                directory: default_log_directory(),
                file: DEFAULT_LOG_FILE.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cache_path_ends_with_database_name() {
        let path = default_cache_path();
        assert!(path.ends_with("tilestash/cache.db"));
    }

    #[test]
    fn test_default_config() {
        let config = ConfigFile::default();

        assert_eq!(config.cache.max_size, 50 * 1024 * 1024);
        assert!(!config.cache.in_memory);
        assert_eq!(config.offline.tile_count_limit, 6000);
        assert_eq!(config.offline.eviction_batch_size, 50);
        assert_eq!(config.logging.file, "tilestash.log");
        assert!(config.logging.directory.ends_with("logs"));
    }
}
