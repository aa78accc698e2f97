//! INI serialization: `ConfigFile` → commented INI string.

use std::path::Path;

use super::settings::ConfigFile;
use super::size::format_size;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    format!(
        r#"[cache]
; Offline database file. Created (with parent directories) if missing.
; Files from older cache-only layouts or corrupt files are replaced.
path = {}
; Budget for ambient (non-offline) cache growth, measured in used database pages.
; Offline region data counts toward the used size but is never evicted.
; Supports: KB, MB, GB suffixes (e.g., 50MB, 1GB)
max_size = {}
; Keep the cache in memory only (nothing is persisted)
in_memory = {}

[offline]
; Number of distinct tiles offline regions may pin before the limit is
; reported as exceeded
tile_count_limit = {}
; Rows deleted per table in each eviction round
eviction_batch_size = {}

[logging]
; Directory for log files
directory = {}
; Log file name (cleared at startup)
file = {}
"#,
        path_to_string(&config.cache.path),
        format_size(config.cache.max_size),
        config.cache.in_memory,
        config.offline.tile_count_limit,
        config.offline.eviction_batch_size,
        path_to_string(&config.logging.directory),
        config.logging.file,
    )
}

/// Render a path, abbreviating the home directory to `~`.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}
