//! User configuration.
//!
//! Settings are read from an INI file (`~/.tilestash/config.ini` by default)
//! and overlaid on built-in defaults.
//!
//! # Example
//!
//! ```no_run
//! use tilestash::config::ConfigFile;
//!
//! let config = ConfigFile::load()?;
//! let cache = config.open_cache()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod size;
mod writer;

pub use defaults::{
    default_cache_path, default_log_directory, DEFAULT_CACHE_FILE_NAME, DEFAULT_LOG_FILE,
};
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{CacheSettings, ConfigFile, LoggingSettings, OfflineSettings};
pub use size::{format_size, parse_size, Size, SizeParseError};
