//! Offline region bookkeeping.
//!
//! A region is a stored definition plus a pin set. Pins live in the
//! `region_resources` and `region_tiles` join tables; deleting a region
//! cascades to its pins and then runs an eviction pass so entries that lost
//! their last pin are reclaimed under the ambient budget.

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use super::statements::statement;
use super::store::{self, Table};
use super::types::CacheError;
use super::{put_internal, OfflineCache};
use crate::offline::{
    decode_region_definition, encode_region_definition, OfflineRegion, OfflineRegionStatus,
    TilePyramidRegionDefinition,
};
use crate::resource::Resource;
use crate::response::Response;

impl OfflineCache {
    /// All stored regions, ordered by id.
    ///
    /// Regions whose definition cannot be decoded are skipped with a warning.
    pub fn list_regions(&self) -> Result<Vec<OfflineRegion>, CacheError> {
        let mut stmt = statement(
            &self.conn,
            "SELECT id, definition, description FROM regions ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Vec<u8>>(1)?,
                row.get::<_, Option<Vec<u8>>>(2)?,
            ))
        })?;

        let mut regions = Vec::new();
        for row in rows {
            let (id, definition, metadata) = row?;
            match decode_region_definition(&definition) {
                Ok(definition) => {
                    regions.push(OfflineRegion::new(id, definition, metadata.unwrap_or_default()))
                }
                Err(e) => warn!(
                    region_id = id,
                    error = %e,
                    "Skipping offline region with undecodable definition"
                ),
            }
        }
        Ok(regions)
    }

    /// Store a new region with an empty pin set.
    pub fn create_region(
        &mut self,
        definition: &TilePyramidRegionDefinition,
        metadata: &[u8],
    ) -> Result<OfflineRegion, CacheError> {
        let encoded = encode_region_definition(definition)?;
        statement(
            &self.conn,
            "INSERT INTO regions (definition, description) VALUES (?1, ?2)",
        )?
        .execute(params![encoded, metadata])?;

        let id = self.conn.last_insert_rowid();
        info!(
            region_id = id,
            style_url = %definition.style_url,
            "Offline region created"
        );
        Ok(OfflineRegion::new(id, definition.clone(), metadata.to_vec()))
    }

    /// Decode the definition of a single region.
    pub fn region_definition(
        &self,
        region_id: i64,
    ) -> Result<TilePyramidRegionDefinition, CacheError> {
        let encoded: Option<Vec<u8>> =
            statement(&self.conn, "SELECT definition FROM regions WHERE id = ?1")?
                .query_row(params![region_id], |row| row.get(0))
                .optional()?;

        match encoded {
            Some(bytes) => Ok(decode_region_definition(&bytes)?),
            None => Err(CacheError::RegionNotFound(region_id)),
        }
    }

    /// Delete a region and its pins, then evict down to the ambient budget.
    ///
    /// Deleting a region that no longer exists does nothing beyond the
    /// eviction pass.
    pub fn delete_region(&mut self, region: OfflineRegion) -> Result<(), CacheError> {
        let policy = self.eviction_policy();
        let tx = self.conn.unchecked_transaction()?;
        let deleted = statement(&tx, "DELETE FROM regions WHERE id = ?1")?
            .execute(params![region.id()])?;
        let evicted = policy.evict(&tx, 0)?;
        tx.commit()?;

        self.offline_tile_count = None;
        self.stats
            .record_eviction(evicted.resources_deleted, evicted.tiles_deleted);

        if deleted == 0 {
            debug!(region_id = region.id(), "Offline region already deleted");
        } else {
            info!(
                region_id = region.id(),
                resources_evicted = evicted.resources_deleted,
                tiles_evicted = evicted.tiles_deleted,
                "Offline region deleted"
            );
        }
        Ok(())
    }

    /// Look up an entry on behalf of a region, pinning it on a hit.
    pub fn get_region_resource(
        &mut self,
        region_id: i64,
        resource: &Resource,
    ) -> Result<Option<Response>, CacheError> {
        let table = Table::for_resource(resource);
        let tx = self.conn.unchecked_transaction()?;
        let response = store::get(&tx, &*table)?;
        let newly_pinned = match response {
            Some(_) => store::mark_used(&tx, &*table, region_id)?,
            None => false,
        };
        tx.commit()?;

        match response {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }
        self.count_pin(resource, newly_pinned);
        Ok(response)
    }

    /// Store an entry on behalf of a region and pin it.
    ///
    /// Region writes never trigger eviction. Returns the stored size.
    pub fn put_region_resource(
        &mut self,
        region_id: i64,
        resource: &Resource,
        response: &Response,
    ) -> Result<u64, CacheError> {
        let tx = self.conn.unchecked_transaction()?;
        let result = put_internal(&tx, resource, response, None, &mut self.stats)?;
        let newly_pinned = store::mark_used(&tx, &*Table::for_resource(resource), region_id)?;
        tx.commit()?;

        self.count_pin(resource, newly_pinned);
        Ok(result.stored_size)
    }

    /// Pin an existing entry to a region.
    ///
    /// Returns true iff no other region already pinned the entry. Missing
    /// entries and unknown regions are silently ignored.
    pub fn mark_used(&mut self, region_id: i64, resource: &Resource) -> Result<bool, CacheError> {
        let tx = self.conn.unchecked_transaction()?;
        let newly_pinned = store::mark_used(&tx, &*Table::for_resource(resource), region_id)?;
        tx.commit()?;

        self.count_pin(resource, newly_pinned);
        Ok(newly_pinned)
    }

    /// Completed figures for a region: pinned entries that hold a payload and
    /// their stored size. Unknown regions report zeros.
    pub fn region_completed_status(
        &self,
        region_id: i64,
    ) -> Result<OfflineRegionStatus, CacheError> {
        let (count, size) = completed_totals(&self.conn, region_id)?;
        Ok(OfflineRegionStatus {
            completed_resource_count: count,
            completed_resource_size: size,
            ..Default::default()
        })
    }

    pub fn set_offline_tile_count_limit(&mut self, limit: u64) {
        self.options.offline_tile_count_limit = limit;
    }

    pub fn offline_tile_count_limit(&self) -> u64 {
        self.options.offline_tile_count_limit
    }

    /// Distinct tiles pinned by at least one region.
    pub fn offline_tile_count(&mut self) -> Result<u64, CacheError> {
        if let Some(count) = self.offline_tile_count {
            return Ok(count);
        }
        let count = pinned_tile_count(&self.conn)?;
        self.offline_tile_count = Some(count);
        Ok(count)
    }

    pub fn offline_tile_count_limit_exceeded(&mut self) -> Result<bool, CacheError> {
        Ok(self.offline_tile_count()? >= self.offline_tile_count_limit())
    }

    fn count_pin(&mut self, resource: &Resource, newly_pinned: bool) {
        if newly_pinned && resource.is_tile() {
            if let Some(count) = self.offline_tile_count.as_mut() {
                *count += 1;
            }
        }
    }
}

fn completed_totals(conn: &Connection, region_id: i64) -> Result<(u64, u64), CacheError> {
    let (count, size): (i64, i64) = statement(
        conn,
        "SELECT COUNT(*), COALESCE(SUM(size), 0) \
         FROM ( \
             SELECT LENGTH(resources.data) AS size \
             FROM region_resources, resources \
             WHERE region_id = ?1 \
               AND resource_id = resources.id \
               AND resources.data IS NOT NULL \
             UNION ALL \
             SELECT LENGTH(tiles.data) AS size \
             FROM region_tiles, tiles \
             WHERE region_id = ?1 \
               AND tile_id = tiles.id \
               AND tiles.data IS NOT NULL \
         )",
    )?
    .query_row(params![region_id], |row| Ok((row.get(0)?, row.get(1)?)))?;

    Ok((count.max(0) as u64, size.max(0) as u64))
}

fn pinned_tile_count(conn: &Connection) -> Result<u64, CacheError> {
    let count: i64 = statement(conn, "SELECT COUNT(DISTINCT tile_id) FROM region_tiles")?
        .query_row([], |row| row.get(0))?;
    Ok(count.max(0) as u64)
}
