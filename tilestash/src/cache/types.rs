//! Core types for the offline cache.

use crate::offline::DefinitionError;
use thiserror::Error;

/// Default ambient cache budget (50 MB).
pub const DEFAULT_MAX_CACHE_SIZE: u64 = 50 * 1024 * 1024;

/// Default number of distinct tiles regions may pin.
pub const DEFAULT_OFFLINE_TILE_COUNT_LIMIT: u64 = 6000;

/// Default number of rows deleted per table per eviction round.
pub const DEFAULT_EVICTION_BATCH_SIZE: u32 = 50;

/// Cache-related errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Error reported by the SQLite engine
    #[error("Cache database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// I/O error (file removal, payload decompression)
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file carries a schema version this build does not recognize
    #[error("Unknown cache schema version {0}")]
    UnknownSchemaVersion(i64),

    /// A stored region definition could not be encoded or decoded
    #[error("Region definition error: {0}")]
    Definition(#[from] DefinitionError),

    /// No region with the given id exists
    #[error("Offline region {0} not found")]
    RegionNotFound(i64),
}

/// Tunable limits of an [`OfflineCache`](crate::cache::OfflineCache).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOptions {
    /// Budget for ambient (unpinned) growth, in bytes of used database pages.
    pub maximum_cache_size: u64,
    /// Maximum number of distinct tiles regions are expected to pin.
    pub offline_tile_count_limit: u64,
    /// Rows deleted per table per eviction round.
    pub eviction_batch_size: u32,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            maximum_cache_size: DEFAULT_MAX_CACHE_SIZE,
            offline_tile_count_limit: DEFAULT_OFFLINE_TILE_COUNT_LIMIT,
            eviction_batch_size: DEFAULT_EVICTION_BATCH_SIZE,
        }
    }
}

impl CacheOptions {
    /// Set the ambient cache budget in bytes.
    pub fn with_maximum_cache_size(mut self, bytes: u64) -> Self {
        self.maximum_cache_size = bytes;
        self
    }

    /// Set the offline tile count limit.
    pub fn with_offline_tile_count_limit(mut self, limit: u64) -> Self {
        self.offline_tile_count_limit = limit;
        self
    }

    /// Set the eviction batch size. Zero is clamped to one.
    pub fn with_eviction_batch_size(mut self, batch: u32) -> Self {
        self.eviction_batch_size = batch.max(1);
        self
    }
}

/// Outcome of a cache put: whether a new row was created and how many bytes
/// were physically written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PutResult {
    pub inserted: bool,
    pub stored_size: u64,
}

impl PutResult {
    pub(crate) const SKIPPED: PutResult = PutResult {
        inserted: false,
        stored_size: 0,
    };
}
