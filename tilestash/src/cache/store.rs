//! Entry storage for generic resources and tiles.
//!
//! The two identity kinds live in separate tables with different keys. Each
//! table is a strategy implementing [`EntryTable`]; the get/put/pin logic is
//! written once against the trait.

use std::ops::Deref;

use rusqlite::{params, Connection, OptionalExtension};

use super::codec::{self, Encoded};
use super::statements::statement;
use super::types::CacheError;
use crate::resource::{Resource, ResourceKind, TileData};
use crate::response::Response;
use crate::time::{from_unix_seconds, now_seconds, to_unix_seconds};

/// Column values written on a full upsert.
pub(crate) struct EntryFields<'a> {
    pub etag: Option<&'a str>,
    pub expires: Option<i64>,
    pub modified: Option<i64>,
    pub accessed: i64,
    pub data: Option<&'a [u8]>,
    pub compressed: bool,
}

/// A row as read back from storage.
#[derive(Debug)]
pub(crate) struct StoredEntry {
    pub etag: Option<String>,
    pub expires: Option<i64>,
    pub modified: Option<i64>,
    pub data: Option<Vec<u8>>,
    pub compressed: bool,
}

impl StoredEntry {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            etag: row.get(0)?,
            expires: row.get(1)?,
            modified: row.get(2)?,
            data: row.get(3)?,
            compressed: row.get(4)?,
        })
    }

    /// Rebuild the response, inflating the payload if needed.
    fn into_response(self) -> Result<Response, CacheError> {
        let mut response = Response {
            etag: self.etag,
            expires: self.expires.map(from_unix_seconds),
            modified: self.modified.map(from_unix_seconds),
            ..Default::default()
        };
        match self.data {
            None => response.no_content = true,
            Some(bytes) => response.data = Some(codec::decode(bytes, self.compressed)?),
        }
        Ok(response)
    }
}

/// Storage strategy for one identity kind.
///
/// Every method addresses the single row matching the strategy's identity.
pub(crate) trait EntryTable {
    /// Set `accessed` on the row, if present.
    fn touch(&self, conn: &Connection, now: i64) -> Result<(), CacheError>;

    /// Read the row.
    fn select(&self, conn: &Connection) -> Result<Option<StoredEntry>, CacheError>;

    /// Revalidation: refresh `accessed` and `expires` only.
    fn refresh(&self, conn: &Connection, expires: Option<i64>, now: i64)
        -> Result<(), CacheError>;

    /// Overwrite the row in place. Returns the number of rows changed.
    fn update(&self, conn: &Connection, fields: &EntryFields<'_>) -> Result<usize, CacheError>;

    /// Insert a new row.
    fn insert(&self, conn: &Connection, fields: &EntryFields<'_>) -> Result<(), CacheError>;

    /// Pin the row to a region. Returns the number of pin rows created, which
    /// is zero when already pinned or when the row or region does not exist.
    fn pin(&self, conn: &Connection, region_id: i64) -> Result<usize, CacheError>;

    /// Whether any region other than `region_id` pins the row.
    fn pinned_elsewhere(&self, conn: &Connection, region_id: i64) -> Result<bool, CacheError>;
}

/// URL-keyed resources.
pub(crate) struct ResourceTable<'a> {
    kind: ResourceKind,
    url: &'a str,
}

impl<'a> ResourceTable<'a> {
    pub fn new(kind: ResourceKind, url: &'a str) -> Self {
        Self { kind, url }
    }
}

impl EntryTable for ResourceTable<'_> {
    fn touch(&self, conn: &Connection, now: i64) -> Result<(), CacheError> {
        statement(conn, "UPDATE resources SET accessed = ?1 WHERE url = ?2")?
            .execute(params![now, self.url])?;
        Ok(())
    }

    fn select(&self, conn: &Connection) -> Result<Option<StoredEntry>, CacheError> {
        let entry = statement(
            conn,
            "SELECT etag, expires, modified, data, compressed \
             FROM resources \
             WHERE url = ?1",
        )?
        .query_row(params![self.url], StoredEntry::from_row)
        .optional()?;
        Ok(entry)
    }

    fn refresh(
        &self,
        conn: &Connection,
        expires: Option<i64>,
        now: i64,
    ) -> Result<(), CacheError> {
        statement(
            conn,
            "UPDATE resources \
             SET accessed = ?1, \
                 expires  = ?2 \
             WHERE url    = ?3",
        )?
        .execute(params![now, expires, self.url])?;
        Ok(())
    }

    fn update(&self, conn: &Connection, fields: &EntryFields<'_>) -> Result<usize, CacheError> {
        let changed = statement(
            conn,
            "UPDATE resources \
             SET kind       = ?1, \
                 etag       = ?2, \
                 expires    = ?3, \
                 modified   = ?4, \
                 accessed   = ?5, \
                 data       = ?6, \
                 compressed = ?7 \
             WHERE url      = ?8",
        )?
        .execute(params![
            self.kind.as_i64(),
            fields.etag,
            fields.expires,
            fields.modified,
            fields.accessed,
            fields.data,
            fields.compressed,
            self.url,
        ])?;
        Ok(changed)
    }

    fn insert(&self, conn: &Connection, fields: &EntryFields<'_>) -> Result<(), CacheError> {
        statement(
            conn,
            "INSERT INTO resources (url, kind, etag, expires, modified, accessed, data, compressed) \
             VALUES                (?1,  ?2,   ?3,   ?4,      ?5,       ?6,       ?7,   ?8)",
        )?
        .execute(params![
            self.url,
            self.kind.as_i64(),
            fields.etag,
            fields.expires,
            fields.modified,
            fields.accessed,
            fields.data,
            fields.compressed,
        ])?;
        Ok(())
    }

    fn pin(&self, conn: &Connection, region_id: i64) -> Result<usize, CacheError> {
        let inserted = statement(
            conn,
            "INSERT OR IGNORE INTO region_resources (region_id, resource_id) \
             SELECT regions.id, resources.id \
             FROM regions, resources \
             WHERE regions.id = ?1 \
               AND resources.url = ?2",
        )?
        .execute(params![region_id, self.url])?;
        Ok(inserted)
    }

    fn pinned_elsewhere(&self, conn: &Connection, region_id: i64) -> Result<bool, CacheError> {
        let found = statement(
            conn,
            "SELECT 1 \
             FROM region_resources, resources \
             WHERE region_id != ?1 \
               AND resource_id = resources.id \
               AND resources.url = ?2 \
             LIMIT 1",
        )?
        .exists(params![region_id, self.url])?;
        Ok(found)
    }
}

/// Coordinate-keyed tiles.
pub(crate) struct TileTable<'a> {
    tile: &'a TileData,
}

impl<'a> TileTable<'a> {
    pub fn new(tile: &'a TileData) -> Self {
        Self { tile }
    }

    fn pixel_ratio(&self) -> f64 {
        f64::from(self.tile.pixel_ratio)
    }

    fn z(&self) -> i64 {
        i64::from(self.tile.z)
    }
}

impl EntryTable for TileTable<'_> {
    fn touch(&self, conn: &Connection, now: i64) -> Result<(), CacheError> {
        statement(
            conn,
            "UPDATE tiles \
             SET accessed       = ?1 \
             WHERE url_template = ?2 \
               AND pixel_ratio  = ?3 \
               AND x            = ?4 \
               AND y            = ?5 \
               AND z            = ?6",
        )?
        .execute(params![
            now,
            self.tile.url_template,
            self.pixel_ratio(),
            self.tile.x,
            self.tile.y,
            self.z(),
        ])?;
        Ok(())
    }

    fn select(&self, conn: &Connection) -> Result<Option<StoredEntry>, CacheError> {
        let entry = statement(
            conn,
            "SELECT etag, expires, modified, data, compressed \
             FROM tiles \
             WHERE url_template = ?1 \
               AND pixel_ratio  = ?2 \
               AND x            = ?3 \
               AND y            = ?4 \
               AND z            = ?5",
        )?
        .query_row(
            params![
                self.tile.url_template,
                self.pixel_ratio(),
                self.tile.x,
                self.tile.y,
                self.z(),
            ],
            StoredEntry::from_row,
        )
        .optional()?;
        Ok(entry)
    }

    fn refresh(
        &self,
        conn: &Connection,
        expires: Option<i64>,
        now: i64,
    ) -> Result<(), CacheError> {
        statement(
            conn,
            "UPDATE tiles \
             SET accessed       = ?1, \
                 expires        = ?2 \
             WHERE url_template = ?3 \
               AND pixel_ratio  = ?4 \
               AND x            = ?5 \
               AND y            = ?6 \
               AND z            = ?7",
        )?
        .execute(params![
            now,
            expires,
            self.tile.url_template,
            self.pixel_ratio(),
            self.tile.x,
            self.tile.y,
            self.z(),
        ])?;
        Ok(())
    }

    fn update(&self, conn: &Connection, fields: &EntryFields<'_>) -> Result<usize, CacheError> {
        let changed = statement(
            conn,
            "UPDATE tiles \
             SET modified       = ?1, \
                 etag           = ?2, \
                 expires        = ?3, \
                 accessed       = ?4, \
                 data           = ?5, \
                 compressed     = ?6 \
             WHERE url_template = ?7 \
               AND pixel_ratio  = ?8 \
               AND x            = ?9 \
               AND y            = ?10 \
               AND z            = ?11",
        )?
        .execute(params![
            fields.modified,
            fields.etag,
            fields.expires,
            fields.accessed,
            fields.data,
            fields.compressed,
            self.tile.url_template,
            self.pixel_ratio(),
            self.tile.x,
            self.tile.y,
            self.z(),
        ])?;
        Ok(changed)
    }

    fn insert(&self, conn: &Connection, fields: &EntryFields<'_>) -> Result<(), CacheError> {
        statement(
            conn,
            "INSERT INTO tiles (url_template, pixel_ratio, x,  y,  z,  modified, etag, expires, accessed, data, compressed) \
             VALUES            (?1,           ?2,          ?3, ?4, ?5, ?6,       ?7,   ?8,      ?9,       ?10,  ?11)",
        )?
        .execute(params![
            self.tile.url_template,
            self.pixel_ratio(),
            self.tile.x,
            self.tile.y,
            self.z(),
            fields.modified,
            fields.etag,
            fields.expires,
            fields.accessed,
            fields.data,
            fields.compressed,
        ])?;
        Ok(())
    }

    fn pin(&self, conn: &Connection, region_id: i64) -> Result<usize, CacheError> {
        let inserted = statement(
            conn,
            "INSERT OR IGNORE INTO region_tiles (region_id, tile_id) \
             SELECT regions.id, tiles.id \
             FROM regions, tiles \
             WHERE regions.id   = ?1 \
               AND url_template = ?2 \
               AND pixel_ratio  = ?3 \
               AND x            = ?4 \
               AND y            = ?5 \
               AND z            = ?6",
        )?
        .execute(params![
            region_id,
            self.tile.url_template,
            self.pixel_ratio(),
            self.tile.x,
            self.tile.y,
            self.z(),
        ])?;
        Ok(inserted)
    }

    fn pinned_elsewhere(&self, conn: &Connection, region_id: i64) -> Result<bool, CacheError> {
        let found = statement(
            conn,
            "SELECT 1 \
             FROM region_tiles, tiles \
             WHERE region_id   != ?1 \
               AND tile_id      = tiles.id \
               AND url_template = ?2 \
               AND pixel_ratio  = ?3 \
               AND x            = ?4 \
               AND y            = ?5 \
               AND z            = ?6 \
             LIMIT 1",
        )?
        .exists(params![
            region_id,
            self.tile.url_template,
            self.pixel_ratio(),
            self.tile.x,
            self.tile.y,
            self.z(),
        ])?;
        Ok(found)
    }
}

/// The strategy selected by a resource's identity kind.
pub(crate) enum Table<'a> {
    Resources(ResourceTable<'a>),
    Tiles(TileTable<'a>),
}

impl<'a> Table<'a> {
    pub fn for_resource(resource: &'a Resource) -> Self {
        match resource {
            Resource::Generic { kind, url } => Self::Resources(ResourceTable::new(*kind, url)),
            Resource::Tile(tile) => Self::Tiles(TileTable::new(tile)),
        }
    }
}

impl<'a> Deref for Table<'a> {
    type Target = dyn EntryTable + 'a;

    fn deref(&self) -> &Self::Target {
        match self {
            Self::Resources(table) => table,
            Self::Tiles(table) => table,
        }
    }
}

/// Look up an entry, marking it as accessed.
pub(crate) fn get(conn: &Connection, table: &dyn EntryTable) -> Result<Option<Response>, CacheError> {
    table.touch(conn, now_seconds())?;
    table
        .select(conn)?
        .map(StoredEntry::into_response)
        .transpose()
}

/// Upsert an entry. `encoded` is the codec output for the payload, `None` for
/// no-content responses. Returns true when a new row was created.
pub(crate) fn put(
    conn: &Connection,
    table: &dyn EntryTable,
    response: &Response,
    encoded: Option<&Encoded>,
) -> Result<bool, CacheError> {
    let now = now_seconds();

    if response.not_modified {
        table.refresh(conn, response.expires.map(to_unix_seconds), now)?;
        return Ok(false);
    }

    // Never REPLACE: that would assign a new id and orphan the pins.
    let fields = EntryFields {
        etag: response.etag.as_deref(),
        expires: response.expires.map(to_unix_seconds),
        modified: response.modified.map(to_unix_seconds),
        accessed: now,
        data: encoded.map(|e| e.bytes.as_slice()),
        compressed: encoded.is_some_and(|e| e.compressed),
    };

    if table.update(conn, &fields)? != 0 {
        return Ok(false);
    }
    table.insert(conn, &fields)?;
    Ok(true)
}

/// Pin an entry to a region.
///
/// Returns true iff the entry was not previously pinned by any other region.
/// Pinning an entry or to a region that does not exist is a silent no-op.
pub(crate) fn mark_used(
    conn: &Connection,
    table: &dyn EntryTable,
    region_id: i64,
) -> Result<bool, CacheError> {
    if table.pin(conn, region_id)? == 0 {
        return Ok(false);
    }
    Ok(!table.pinned_elsewhere(conn, region_id)?)
}
