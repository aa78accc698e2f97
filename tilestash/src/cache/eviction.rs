//! Page-accounting LRU eviction.
//!
//! Space is measured in used database pages (`page_count - freelist_count`),
//! not payload bytes, so fragmentation and row overhead are charged to the
//! budget. Eviction deletes the least recently accessed unpinned rows in
//! batches until the requested space fits. The file itself is never
//! truncated; freed pages are reused by later writes.

use rusqlite::{params, Connection};
use tracing::{debug, warn};

use super::statements::{pragma_i64, statement};
use super::types::CacheError;

/// Budget parameters for one eviction pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EvictionPolicy {
    pub maximum_cache_size: u64,
    pub batch_size: u32,
}

/// Result of an eviction pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EvictionResult {
    /// Whether the requested space now fits within the budget.
    pub fits: bool,
    pub resources_deleted: u64,
    pub tiles_deleted: u64,
}

/// Page geometry of the database.
#[derive(Debug, Clone, Copy)]
struct PageUsage {
    page_size: u64,
    page_count: u64,
    freelist_count: u64,
}

impl PageUsage {
    fn read(conn: &Connection) -> Result<Self, CacheError> {
        let read = |sql: &str| pragma_i64(conn, sql).map(|v| v.max(0) as u64);
        Ok(Self {
            page_size: read("PRAGMA page_size")?,
            page_count: read("PRAGMA page_count")?,
            freelist_count: read("PRAGMA freelist_count")?,
        })
    }

    fn used_bytes(&self) -> u64 {
        self.page_size
            .saturating_mul(self.page_count.saturating_sub(self.freelist_count))
    }

    fn file_bytes(&self) -> u64 {
        self.page_size.saturating_mul(self.page_count)
    }
}

/// Bytes of database pages currently holding data.
pub(crate) fn used_bytes(conn: &Connection) -> Result<u64, CacheError> {
    Ok(PageUsage::read(conn)?.used_bytes())
}

impl EvictionPolicy {
    /// Make room for `needed` more bytes.
    ///
    /// One page of slack is always reserved for row overhead. Returns with
    /// `fits == false` when every remaining row is pinned.
    pub fn evict(&self, conn: &Connection, needed: u64) -> Result<EvictionResult, CacheError> {
        let mut result = EvictionResult::default();

        let usage = PageUsage::read(conn)?;
        if usage.file_bytes() > self.maximum_cache_size {
            warn!(
                file_bytes = usage.file_bytes(),
                limit_bytes = self.maximum_cache_size,
                "Offline database is larger than the cache budget"
            );
        }

        loop {
            let usage = PageUsage::read(conn)?;
            let required = usage
                .used_bytes()
                .saturating_add(needed)
                .saturating_add(usage.page_size);

            if required <= self.maximum_cache_size {
                result.fits = true;
                break;
            }

            let resources = self.delete_batch(conn, DELETE_RESOURCES)?;
            let tiles = self.delete_batch(conn, DELETE_TILES)?;
            result.resources_deleted += resources;
            result.tiles_deleted += tiles;

            debug!(
                used_bytes = usage.used_bytes(),
                needed_bytes = needed,
                limit_bytes = self.maximum_cache_size,
                resources_deleted = resources,
                tiles_deleted = tiles,
                "Eviction round"
            );

            if resources == 0 && tiles == 0 {
                break;
            }
        }

        Ok(result)
    }

    fn delete_batch(&self, conn: &Connection, sql: &str) -> Result<u64, CacheError> {
        let deleted = statement(conn, sql)?.execute(params![self.batch_size])?;
        Ok(deleted as u64)
    }
}

const DELETE_RESOURCES: &str = "\
    DELETE FROM resources \
    WHERE id IN ( \
        SELECT resources.id FROM resources \
        LEFT JOIN region_resources ON resource_id = resources.id \
        WHERE resource_id IS NULL \
        ORDER BY accessed ASC \
        LIMIT ?1 \
    )";

const DELETE_TILES: &str = "\
    DELETE FROM tiles \
    WHERE id IN ( \
        SELECT tiles.id FROM tiles \
        LEFT JOIN region_tiles ON tile_id = tiles.id \
        WHERE tile_id IS NULL \
        ORDER BY accessed ASC \
        LIMIT ?1 \
    )";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::codec;
    use crate::cache::schema;
    use crate::cache::store::{self, Table};
    use crate::resource::Resource;
    use crate::response::Response;

    /// Deterministic incompressible bytes.
    fn noise(len: usize, mut seed: u64) -> Vec<u8> {
        (0..len)
            .map(|_| {
                seed ^= seed << 13;
                seed ^= seed >> 7;
                seed ^= seed << 17;
                seed as u8
            })
            .collect()
    }

    fn tile(x: i32) -> Resource {
        Resource::tile("https://t/{z}/{x}/{y}.png", 1.0, x, 0, 10)
    }

    fn put_tile(conn: &Connection, x: i32, accessed: i64) {
        let resource = tile(x);
        let response = Response::with_data(noise(20_000, x as u64 + 1));
        let encoded = response.stored_payload().map(codec::encode);
        store::put(conn, &*Table::for_resource(&resource), &response, encoded.as_ref()).unwrap();
        conn.execute(
            "UPDATE tiles SET accessed = ?1 WHERE x = ?2",
            params![accessed, x],
        )
        .unwrap();
    }

    fn tile_present(conn: &Connection, x: i32) -> bool {
        conn.query_row("SELECT COUNT(*) FROM tiles WHERE x = ?1", params![x], |row| {
            row.get::<_, i64>(0)
        })
        .unwrap()
            == 1
    }

    fn resource(n: i64) -> Resource {
        Resource::style(format!("https://example.com/style-{n}.json"))
    }

    fn put_resource(conn: &Connection, n: i64, accessed: i64) {
        let resource = resource(n);
        let response = Response::with_data(noise(20_000, n as u64 + 100));
        let encoded = response.stored_payload().map(codec::encode);
        store::put(conn, &*Table::for_resource(&resource), &response, encoded.as_ref()).unwrap();
        conn.execute(
            "UPDATE resources SET accessed = ?1 WHERE url = ?2",
            params![accessed, format!("https://example.com/style-{n}.json")],
        )
        .unwrap();
    }

    fn resource_present(conn: &Connection, n: i64) -> bool {
        conn.query_row(
            "SELECT COUNT(*) FROM resources WHERE url = ?1",
            params![format!("https://example.com/style-{n}.json")],
            |row| row.get::<_, i64>(0),
        )
        .unwrap()
            == 1
    }

    fn pin_resource(conn: &Connection, n: i64) {
        conn.execute("INSERT INTO regions (id, definition) VALUES (1, x'00')", [])
            .unwrap();
        assert!(store::mark_used(conn, &*Table::for_resource(&resource(n)), 1).unwrap());
    }

    #[test]
    fn test_nothing_deleted_when_it_fits() {
        let conn = schema::open_in_memory().unwrap();
        put_tile(&conn, 0, 1);

        let policy = EvictionPolicy {
            maximum_cache_size: u64::MAX,
            batch_size: 50,
        };
        let result = policy.evict(&conn, 1024).unwrap();

        assert!(result.fits);
        assert_eq!(result.tiles_deleted, 0);
        assert!(tile_present(&conn, 0));
    }

    #[test]
    fn test_least_recently_accessed_goes_first() {
        let conn = schema::open_in_memory().unwrap();
        put_tile(&conn, 1, 300);
        put_tile(&conn, 2, 100);
        put_tile(&conn, 3, 200);
        let used = used_bytes(&conn).unwrap();

        let policy = EvictionPolicy {
            maximum_cache_size: used - 1,
            batch_size: 1,
        };
        let result = policy.evict(&conn, 0).unwrap();

        assert!(result.fits);
        assert_eq!(result.tiles_deleted, 1);
        assert!(!tile_present(&conn, 2));
        assert!(tile_present(&conn, 1));
        assert!(tile_present(&conn, 3));
    }

    #[test]
    fn test_used_bytes_stays_within_budget() {
        let conn = schema::open_in_memory().unwrap();
        for x in 0..8 {
            put_tile(&conn, x, x as i64);
        }
        let used = used_bytes(&conn).unwrap();
        let limit = used / 2;

        let policy = EvictionPolicy {
            maximum_cache_size: limit,
            batch_size: 1,
        };
        let result = policy.evict(&conn, 0).unwrap();
        let page_size = pragma_i64(&conn, "PRAGMA page_size").unwrap() as u64;

        assert!(result.fits);
        assert!(used_bytes(&conn).unwrap() + page_size <= limit);
        // Newest tile survives
        assert!(tile_present(&conn, 7));
    }

    #[test]
    fn test_pinned_rows_are_never_deleted() {
        let conn = schema::open_in_memory().unwrap();
        conn.execute("INSERT INTO regions (id, definition) VALUES (1, x'00')", [])
            .unwrap();
        put_tile(&conn, 0, 1);
        store::mark_used(&conn, &*Table::for_resource(&tile(0)), 1).unwrap();

        let policy = EvictionPolicy {
            maximum_cache_size: 0,
            batch_size: 50,
        };
        let result = policy.evict(&conn, 0).unwrap();

        assert!(!result.fits);
        assert_eq!(result.tiles_deleted, 0);
        assert!(tile_present(&conn, 0));
    }

    #[test]
    fn test_empty_store_over_budget_does_not_fit() {
        let conn = schema::open_in_memory().unwrap();
        let policy = EvictionPolicy {
            maximum_cache_size: 0,
            batch_size: 50,
        };
        assert!(!policy.evict(&conn, 0).unwrap().fits);
    }

    #[test]
    fn test_used_bytes_excludes_free_pages() {
        let conn = schema::open_in_memory().unwrap();
        put_tile(&conn, 0, 1);
        let before = used_bytes(&conn).unwrap();

        conn.execute("DELETE FROM tiles", []).unwrap();

        assert!(used_bytes(&conn).unwrap() < before);
    }

    #[test]
    fn test_least_recently_accessed_resource_goes_first() {
        let conn = schema::open_in_memory().unwrap();
        put_resource(&conn, 1, 300);
        put_resource(&conn, 2, 100);
        put_resource(&conn, 3, 200);
        let used = used_bytes(&conn).unwrap();

        let policy = EvictionPolicy {
            maximum_cache_size: used - 1,
            batch_size: 1,
        };
        let result = policy.evict(&conn, 0).unwrap();

        assert!(result.fits);
        assert_eq!(result.resources_deleted, 1);
        assert_eq!(result.tiles_deleted, 0);
        assert!(!resource_present(&conn, 2));
        assert!(resource_present(&conn, 1));
        assert!(resource_present(&conn, 3));
    }

    #[test]
    fn test_resources_and_tiles_share_the_budget() {
        let conn = schema::open_in_memory().unwrap();
        for n in 0..4 {
            put_resource(&conn, n, n);
            put_tile(&conn, n as i32, n);
        }

        let policy = EvictionPolicy {
            maximum_cache_size: 0,
            batch_size: 50,
        };
        let result = policy.evict(&conn, 0).unwrap();

        assert!(!result.fits);
        assert_eq!(result.resources_deleted, 4);
        assert_eq!(result.tiles_deleted, 4);
    }

    #[test]
    fn test_pinned_resource_survives_zero_budget() {
        let conn = schema::open_in_memory().unwrap();
        put_resource(&conn, 1, 1);
        put_resource(&conn, 2, 2);
        pin_resource(&conn, 1);

        let policy = EvictionPolicy {
            maximum_cache_size: 0,
            batch_size: 50,
        };
        let result = policy.evict(&conn, 0).unwrap();

        assert!(!result.fits);
        assert_eq!(result.resources_deleted, 1);
        assert!(resource_present(&conn, 1));
        assert!(!resource_present(&conn, 2));
    }

    #[test]
    fn test_resource_reclaimed_after_region_deleted() {
        let conn = schema::open_in_memory().unwrap();
        put_resource(&conn, 1, 1);
        pin_resource(&conn, 1);

        let policy = EvictionPolicy {
            maximum_cache_size: 0,
            batch_size: 50,
        };
        assert_eq!(policy.evict(&conn, 0).unwrap().resources_deleted, 0);

        conn.execute("DELETE FROM regions WHERE id = 1", []).unwrap();
        let result = policy.evict(&conn, 0).unwrap();

        assert_eq!(result.resources_deleted, 1);
        assert!(!resource_present(&conn, 1));
    }
}
