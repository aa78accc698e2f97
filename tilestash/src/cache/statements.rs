//! Prepared statement cache.
//!
//! Statements are memoized per connection by SQL text using rusqlite's
//! built-in LRU. A handle returned to the cache is reset and its bindings are
//! cleared, so every acquisition starts from a clean statement.

use rusqlite::{CachedStatement, Connection};

use super::types::CacheError;

/// Number of distinct statements kept prepared. Comfortably above the number
/// of SQL texts the cache issues, so nothing is ever re-parsed.
pub(crate) const STATEMENT_CACHE_CAPACITY: usize = 64;

/// Size the connection's statement cache.
pub(crate) fn configure(conn: &Connection) {
    conn.set_prepared_statement_cache_capacity(STATEMENT_CACHE_CAPACITY);
}

/// Acquire a prepared statement for `sql`, parsing it only on first use.
pub(crate) fn statement<'conn>(
    conn: &'conn Connection,
    sql: &str,
) -> Result<CachedStatement<'conn>, CacheError> {
    Ok(conn.prepare_cached(sql)?)
}

/// Read a single integer pragma, e.g. `PRAGMA page_count`.
pub(crate) fn pragma_i64(conn: &Connection, sql: &str) -> Result<i64, CacheError> {
    Ok(statement(conn, sql)?.query_row([], |row| row.get(0))?)
}
