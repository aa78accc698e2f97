//! INI parsing: `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.
//! Unknown sections and keys are ignored.

use std::path::PathBuf;
use std::str::FromStr;

use ini::Ini;

use super::file::ConfigFileError;
use super::settings::ConfigFile;
use super::size::parse_size;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = section.get("path") {
            let v = v.trim();
            if !v.is_empty() {
                config.cache.path = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("max_size") {
            config.cache.max_size = parse_size(v).map_err(|_| {
                invalid("cache", "max_size", v, "expected format like '50MB', '2GB', or '1048576'")
            })?;
        }
        if let Some(v) = section.get("in_memory") {
            config.cache.in_memory = parse_bool(v);
        }
    }

    // [offline] section
    if let Some(section) = ini.section(Some("offline")) {
        if let Some(v) = section.get("tile_count_limit") {
            config.offline.tile_count_limit = parse_number(v).map_err(|_| {
                invalid("offline", "tile_count_limit", v, "must be a non-negative integer")
            })?;
        }
        if let Some(v) = section.get("eviction_batch_size") {
            let batch: u32 = parse_number(v).map_err(|_| {
                invalid("offline", "eviction_batch_size", v, "must be a positive integer")
            })?;
            if batch == 0 {
                return Err(invalid(
                    "offline",
                    "eviction_batch_size",
                    v,
                    "must be at least 1",
                ));
            }
            config.offline.eviction_batch_size = batch;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.directory = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = v.to_string();
            }
        }
    }

    Ok(config)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_number<T: FromStr>(value: &str) -> Result<T, T::Err> {
    value.trim().parse()
}

pub(super) fn parse_bool(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    v == "true" || v == "1" || v == "yes" || v == "on"
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::*;

    fn parse(content: &str) -> Result<ConfigFile, ConfigFileError> {
        let ini = Ini::load_from_str(content).unwrap();
        parse_ini(&ini)
    }

    #[test]
    fn test_empty_ini_gives_defaults() {
        assert_eq!(parse("").unwrap(), ConfigFile::default());
    }

    #[test]
    fn test_cache_section() {
        let config = parse(
            "[cache]\n\
             path = /var/cache/tilestash/offline.db\n\
             max_size = 200MB\n\
             in_memory = yes\n",
        )
        .unwrap();

        assert_eq!(
            config.cache.path,
            PathBuf::from("/var/cache/tilestash/offline.db")
        );
        assert_eq!(config.cache.max_size, 200 * 1024 * 1024);
        assert!(config.cache.in_memory);
    }

    #[test]
    fn test_empty_path_keeps_default() {
        let config = parse("[cache]\npath =\n").unwrap();
        assert_eq!(config.cache.path, default_cache_path());
    }

    #[test]
    fn test_offline_section() {
        let config = parse(
            "[offline]\n\
             tile_count_limit = 10000\n\
             eviction_batch_size = 25\n",
        )
        .unwrap();

        assert_eq!(config.offline.tile_count_limit, 10_000);
        assert_eq!(config.offline.eviction_batch_size, 25);
    }

    #[test]
    fn test_logging_section() {
        let config = parse("[logging]\ndirectory = /tmp/ts-logs\nfile = cache.log\n").unwrap();
        assert_eq!(config.logging.directory, PathBuf::from("/tmp/ts-logs"));
        assert_eq!(config.logging.file, "cache.log");
    }

    #[test]
    fn test_invalid_max_size() {
        let err = parse("[cache]\nmax_size = lots\n").unwrap_err();
        match err {
            ConfigFileError::InvalidValue { section, key, .. } => {
                assert_eq!(section, "cache");
                assert_eq!(key, "max_size");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        assert!(matches!(
            parse("[offline]\neviction_batch_size = 0\n"),
            Err(ConfigFileError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_negative_tile_limit_rejected() {
        assert!(parse("[offline]\ntile_count_limit = -5\n").is_err());
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let config = parse("[cache]\ncolour = blue\n[extra]\nfoo = bar\n").unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("true"));
        assert!(parse_bool(" ON "));
        assert!(parse_bool("1"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool("nope"));
    }

    #[test]
    fn test_expand_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/cache.db"), home.join("cache.db"));
        }
        assert_eq!(expand_tilde("/abs/cache.db"), PathBuf::from("/abs/cache.db"));
    }
}
