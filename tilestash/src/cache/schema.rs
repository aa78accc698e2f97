//! Schema lifecycle: creation, version check and destructive migration.
//!
//! The schema version lives in `PRAGMA user_version`. Databases written by the
//! older cache-only layouts (versions 0 and 1) hold nothing a user created, so
//! they are discarded and rebuilt rather than migrated. Files that are not
//! SQLite databases at all are treated the same way. A version this build does
//! not know about is a hard error: it was written by newer software and may
//! contain offline regions.

use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, ErrorCode, OpenFlags};
use tracing::{debug, info, warn};

use super::statements;
use super::types::CacheError;

/// Version written to `user_version` for databases created by this build.
pub const SCHEMA_VERSION: i64 = 2;

const SCHEMA: &str = "
CREATE TABLE resources (
    id         INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
    url        TEXT    NOT NULL,
    kind       INTEGER NOT NULL,
    expires    INTEGER,
    modified   INTEGER,
    etag       TEXT,
    data       BLOB,
    compressed INTEGER NOT NULL DEFAULT 0,
    accessed   INTEGER NOT NULL,
    UNIQUE (url)
);

CREATE TABLE tiles (
    id           INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
    url_template TEXT    NOT NULL,
    pixel_ratio  REAL    NOT NULL,
    z            INTEGER NOT NULL,
    x            INTEGER NOT NULL,
    y            INTEGER NOT NULL,
    expires      INTEGER,
    modified     INTEGER,
    etag         TEXT,
    data         BLOB,
    compressed   INTEGER NOT NULL DEFAULT 0,
    accessed     INTEGER NOT NULL,
    UNIQUE (url_template, pixel_ratio, z, x, y)
);

CREATE TABLE regions (
    id          INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
    definition  BLOB    NOT NULL,
    description BLOB
);

CREATE TABLE region_resources (
    region_id   INTEGER NOT NULL REFERENCES regions(id) ON DELETE CASCADE,
    resource_id INTEGER NOT NULL REFERENCES resources(id),
    UNIQUE (region_id, resource_id)
);

CREATE TABLE region_tiles (
    region_id INTEGER NOT NULL REFERENCES regions(id) ON DELETE CASCADE,
    tile_id   INTEGER NOT NULL REFERENCES tiles(id),
    UNIQUE (region_id, tile_id)
);

CREATE INDEX resources_accessed ON resources (accessed);
CREATE INDEX tiles_accessed ON tiles (accessed);
CREATE INDEX region_resources_resource_id ON region_resources (resource_id);
CREATE INDEX region_tiles_tile_id ON region_tiles (tile_id);
";

/// Open a private in-memory store with a fresh schema.
pub(crate) fn open_in_memory() -> Result<Connection, CacheError> {
    let mut conn = Connection::open_in_memory()?;
    configure(&conn)?;
    create_schema(&mut conn)?;
    Ok(conn)
}

/// Open the store at `path`, guaranteeing it carries exactly the current
/// schema. Incompatible or corrupt files are deleted and recreated.
pub(crate) fn ensure_schema(path: &Path) -> Result<Connection, CacheError> {
    match Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_WRITE) {
        Ok(conn) => match read_version(&conn) {
            Ok(SCHEMA_VERSION) => {
                configure(&conn)?;
                debug!(path = %path.display(), "Opened offline cache");
                return Ok(conn);
            }
            // Cache-only layouts; safe to delete
            Ok(version @ (0 | 1)) => {
                drop(conn);
                remove_existing(path, &format!("legacy schema version {}", version))?;
            }
            Ok(version) => return Err(CacheError::UnknownSchemaVersion(version)),
            Err(e) if e.sqlite_error_code() == Some(ErrorCode::NotADatabase) => {
                drop(conn);
                remove_existing(path, "file is not a database")?;
            }
            Err(e) => return Err(e.into()),
        },
        Err(e) if e.sqlite_error_code() == Some(ErrorCode::CannotOpen) => {
            info!(path = %path.display(), "Creating new offline cache");
        }
        Err(e) if e.sqlite_error_code() == Some(ErrorCode::NotADatabase) => {
            remove_existing(path, "file is not a database")?;
        }
        Err(e) => return Err(e.into()),
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
    )?;
    configure(&conn)?;
    create_schema(&mut conn)?;
    Ok(conn)
}

/// Read the schema version marker.
pub(crate) fn read_version(conn: &Connection) -> rusqlite::Result<i64> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
}

/// Per-connection settings. Must run outside a transaction.
fn configure(conn: &Connection) -> Result<(), CacheError> {
    // Block instead of failing when another connection holds the lock.
    conn.busy_timeout(Duration::from_millis(i32::MAX as u64))?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    statements::configure(conn);
    Ok(())
}

/// Create all tables and write the version marker in one transaction.
fn create_schema(conn: &mut Connection) -> Result<(), CacheError> {
    let tx = conn.transaction()?;
    tx.execute_batch(SCHEMA)?;
    tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    tx.commit()?;
    Ok(())
}

/// Delete an incompatible database file along with any journal sidecars.
fn remove_existing(path: &Path, reason: &str) -> Result<(), CacheError> {
    warn!(
        path = %path.display(),
        reason,
        "Removing existing incompatible offline database"
    );

    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    for suffix in ["-journal", "-wal", "-shm"] {
        let mut sidecar = path.as_os_str().to_owned();
        sidecar.push(suffix);
        let _ = std::fs::remove_file(sidecar);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<Vec<String>>>()
            .unwrap()
    }

    fn write_database_with_version(path: &Path, version: i64) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch("CREATE TABLE legacy (v INTEGER); INSERT INTO legacy VALUES (1);")
            .unwrap();
        conn.pragma_update(None, "user_version", version).unwrap();
    }

    #[test]
    fn test_creates_missing_database() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.db");

        let conn = ensure_schema(&path).unwrap();

        assert!(path.exists());
        assert_eq!(read_version(&conn).unwrap(), SCHEMA_VERSION);
        let tables = table_names(&conn);
        for table in ["regions", "region_resources", "region_tiles", "resources", "tiles"] {
            assert!(tables.iter().any(|t| t == table), "missing table {}", table);
        }
    }

    #[test]
    fn test_creates_missing_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("dir").join("cache.db");

        ensure_schema(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_current_version_is_kept() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.db");

        {
            let conn = ensure_schema(&path).unwrap();
            conn.execute(
                "INSERT INTO regions (definition, description) VALUES (x'00', x'01')",
                [],
            )
            .unwrap();
        }

        let conn = ensure_schema(&path).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM regions", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_legacy_versions_are_discarded() {
        for version in [0, 1] {
            let temp_dir = TempDir::new().unwrap();
            let path = temp_dir.path().join("cache.db");
            write_database_with_version(&path, version);

            let conn = ensure_schema(&path).unwrap();

            assert_eq!(read_version(&conn).unwrap(), SCHEMA_VERSION);
            assert!(!table_names(&conn).iter().any(|t| t == "legacy"));
        }
    }

    #[test]
    fn test_unknown_version_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.db");
        write_database_with_version(&path, 7);

        let result = ensure_schema(&path);
        assert!(matches!(result, Err(CacheError::UnknownSchemaVersion(7))));

        // The file must not have been touched
        let conn = Connection::open(&path).unwrap();
        assert_eq!(read_version(&conn).unwrap(), 7);
        assert!(table_names(&conn).iter().any(|t| t == "legacy"));
    }

    #[test]
    fn test_corrupt_file_is_recreated() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.db");
        std::fs::write(&path, vec![b'x'; 8192]).unwrap();

        let conn = ensure_schema(&path).unwrap();
        assert_eq!(read_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_empty_file_is_recreated() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache.db");
        std::fs::write(&path, b"").unwrap();

        let conn = ensure_schema(&path).unwrap();
        assert_eq!(read_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_in_memory_has_fresh_schema() {
        let conn = open_in_memory().unwrap();
        assert_eq!(read_version(&conn).unwrap(), SCHEMA_VERSION);
        let foreign_keys: i64 = conn
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .unwrap();
        assert_eq!(foreign_keys, 1);
    }
}
