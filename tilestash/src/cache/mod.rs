//! SQLite-backed offline cache for map resources and tiles.
//!
//! An [`OfflineCache`] owns one database connection. Ambient entries are kept
//! under a byte budget by LRU eviction; entries pinned by an offline region
//! are exempt until the last region referencing them is deleted.
//!
//! Every public operation runs in a single SQLite transaction.

mod codec;
mod eviction;
mod regions;
mod schema;
mod statements;
mod stats;
mod store;
mod types;

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tracing::{debug, error, info, warn};

use crate::resource::Resource;
use crate::response::Response;
use codec::Encoded;
use eviction::EvictionPolicy;
use store::Table;

pub use schema::SCHEMA_VERSION;
pub use stats::CacheStats;
pub use types::{
    CacheError, CacheOptions, PutResult, DEFAULT_EVICTION_BATCH_SIZE, DEFAULT_MAX_CACHE_SIZE,
    DEFAULT_OFFLINE_TILE_COUNT_LIMIT,
};

/// Offline resource/tile cache.
///
/// Mutating operations take `&mut self`; a cache has exactly one writer.
pub struct OfflineCache {
    conn: Connection,
    path: Option<PathBuf>,
    options: CacheOptions,
    /// Distinct tiles pinned by any region, computed on first use.
    offline_tile_count: Option<u64>,
    stats: CacheStats,
}

impl OfflineCache {
    /// Open (or create) the cache at `path`.
    ///
    /// Legacy and corrupt files are discarded and recreated. A file written by
    /// a newer schema is rejected with [`CacheError::UnknownSchemaVersion`].
    pub fn open(path: impl AsRef<Path>, options: CacheOptions) -> Result<Self, CacheError> {
        let path = path.as_ref();
        let conn = schema::ensure_schema(path)?;

        info!(
            path = %path.display(),
            max_size_bytes = options.maximum_cache_size,
            "Offline cache opened"
        );

        Ok(Self::with_connection(conn, Some(path.to_path_buf()), options))
    }

    /// Open a private, non-persistent cache.
    pub fn open_in_memory(options: CacheOptions) -> Result<Self, CacheError> {
        let conn = schema::open_in_memory()?;
        debug!(
            max_size_bytes = options.maximum_cache_size,
            "In-memory offline cache opened"
        );
        Ok(Self::with_connection(conn, None, options))
    }

    fn with_connection(conn: Connection, path: Option<PathBuf>, options: CacheOptions) -> Self {
        Self {
            conn,
            path,
            options,
            offline_tile_count: None,
            stats: CacheStats::new(),
        }
    }

    /// Database file, or `None` for an in-memory cache.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Look up a cached response, refreshing its access time.
    pub fn get(&mut self, resource: &Resource) -> Result<Option<Response>, CacheError> {
        let tx = self.conn.unchecked_transaction()?;
        let response = store::get(&tx, &*Table::for_resource(resource))?;
        tx.commit()?;

        match response {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }
        Ok(response)
    }

    /// Store an ambient response, evicting unpinned entries as needed.
    ///
    /// Error responses are never stored. When eviction cannot make room the
    /// write is dropped and the result reports nothing inserted and zero
    /// bytes stored.
    pub fn put(&mut self, resource: &Resource, response: &Response) -> Result<PutResult, CacheError> {
        let policy = self.eviction_policy();
        let tx = self.conn.unchecked_transaction()?;
        let result = put_internal(&tx, resource, response, Some(policy), &mut self.stats)?;
        tx.commit()?;
        Ok(result)
    }

    /// Evict unpinned entries until `needed` more bytes fit in the budget.
    ///
    /// Returns false when the budget cannot be met because everything left is
    /// pinned.
    pub fn evict(&mut self, needed: u64) -> Result<bool, CacheError> {
        let policy = self.eviction_policy();
        let tx = self.conn.unchecked_transaction()?;
        let result = policy.evict(&tx, needed)?;
        tx.commit()?;

        self.stats
            .record_eviction(result.resources_deleted, result.tiles_deleted);
        Ok(result.fits)
    }

    /// Change the ambient budget. Takes effect on the next eviction.
    pub fn set_maximum_cache_size(&mut self, bytes: u64) {
        self.options.maximum_cache_size = bytes;
    }

    pub fn maximum_cache_size(&self) -> u64 {
        self.options.maximum_cache_size
    }

    /// Bytes of database pages currently holding data.
    pub fn used_bytes(&self) -> Result<u64, CacheError> {
        eviction::used_bytes(&self.conn)
    }

    /// Close the database. Failures are logged, not returned.
    pub fn close(self) {
        let Self {
            conn, path, stats, ..
        } = self;

        debug!(stats = %stats, "Closing offline cache");
        if let Err((_conn, e)) = conn.close() {
            error!(
                path = ?path,
                error = %e,
                "Failed to close offline cache"
            );
        }
    }

    fn eviction_policy(&self) -> EvictionPolicy {
        EvictionPolicy {
            maximum_cache_size: self.options.maximum_cache_size,
            batch_size: self.options.eviction_batch_size,
        }
    }
}

/// Shared put path for ambient (`eviction = Some`) and region writes.
fn put_internal(
    conn: &Connection,
    resource: &Resource,
    response: &Response,
    eviction: Option<EvictionPolicy>,
    stats: &mut CacheStats,
) -> Result<PutResult, CacheError> {
    if let Some(err) = &response.error {
        debug!(
            resource = %resource,
            reason = ?err.reason,
            "Not caching error response"
        );
        return Ok(PutResult::SKIPPED);
    }

    let encoded = response.stored_payload().map(codec::encode);
    let stored_size = encoded.as_ref().map_or(0, Encoded::stored_size);

    if let Some(policy) = eviction {
        let evicted = policy.evict(conn, stored_size)?;
        stats.record_eviction(evicted.resources_deleted, evicted.tiles_deleted);

        if !evicted.fits {
            warn!(
                resource = %resource,
                stored_size,
                limit_bytes = policy.maximum_cache_size,
                "Unable to make space for cache entry"
            );
            stats.record_skipped_write();
            return Ok(PutResult::SKIPPED);
        }
    }

    let inserted = store::put(
        conn,
        &*Table::for_resource(resource),
        response,
        encoded.as_ref(),
    )?;

    if response.not_modified {
        stats.record_revalidation();
    } else {
        stats.record_write();
    }

    Ok(PutResult {
        inserted,
        stored_size,
    })
}
