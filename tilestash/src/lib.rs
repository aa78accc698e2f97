//! tilestash - embedded offline cache for map resources and tiles
//!
//! Responses fetched for a map client (styles, sources, glyphs, sprites and
//! tiles) are stored in a single SQLite file. Ambient entries are kept under
//! a byte budget with LRU eviction; entries belonging to a user-defined
//! offline region are pinned and survive eviction until the region is
//! deleted.
//!
//! ```no_run
//! use tilestash::cache::{CacheOptions, OfflineCache};
//! use tilestash::resource::Resource;
//! use tilestash::response::Response;
//!
//! let mut cache = OfflineCache::open("/tmp/tilestash/cache.db", CacheOptions::default())?;
//! let tile = Resource::tile("https://tiles.example.com/{z}/{x}/{y}.pbf", 1.0, 0, 0, 0);
//!
//! cache.put(&tile, &Response::with_data(vec![0u8; 128]))?;
//! assert!(cache.get(&tile)?.is_some());
//! # Ok::<(), tilestash::cache::CacheError>(())
//! ```

pub mod cache;
pub mod config;
pub mod logging;
pub mod offline;
pub mod resource;
pub mod response;
pub mod time;

/// Version of the tilestash library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
