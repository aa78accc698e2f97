//! Settings structs for each configuration section.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::path::PathBuf;

/// Complete configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// Database location and ambient budget
    pub cache: CacheSettings,
    /// Offline region limits and eviction tuning
    pub offline: OfflineSettings,
    /// Log output
    pub logging: LoggingSettings,
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    /// Database file path
    pub path: PathBuf,
    /// Ambient cache budget in bytes
    pub max_size: u64,
    /// Keep the cache in memory instead of on disk
    pub in_memory: bool,
}

/// `[offline]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct OfflineSettings {
    /// Number of distinct tiles regions may pin before the limit is reported
    /// as exceeded
    pub tile_count_limit: u64,
    /// Rows deleted per table per eviction round
    pub eviction_batch_size: u32,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Directory for log files
    pub directory: PathBuf,
    /// Log file name inside `directory`
    pub file: String,
}
