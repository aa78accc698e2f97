//! Offline region model.
//!
//! Regions pin cache entries so they survive ambient eviction. This module
//! holds the data types and the private definition encoding; the bookkeeping
//! lives in [`crate::cache`].

mod definition;
mod region;

pub use definition::{
    decode_region_definition, encode_region_definition, DefinitionError, LatLngBounds,
    TilePyramidRegionDefinition, DEFINITION_ENCODING_VERSION,
};
pub use region::{DownloadState, OfflineRegion, OfflineRegionStatus, RegionMetadata};
