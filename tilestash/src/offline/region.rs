//! Offline regions and their download status.

use super::definition::TilePyramidRegionDefinition;

/// Arbitrary application metadata attached to a region. Never interpreted.
pub type RegionMetadata = Vec<u8>;

/// A stored offline region.
///
/// Only the cache constructs regions; the definition and metadata are fixed
/// for the lifetime of the region.
#[derive(Debug, Clone, PartialEq)]
pub struct OfflineRegion {
    id: i64,
    definition: TilePyramidRegionDefinition,
    metadata: RegionMetadata,
}

impl OfflineRegion {
    pub(crate) fn new(
        id: i64,
        definition: TilePyramidRegionDefinition,
        metadata: RegionMetadata,
    ) -> Self {
        Self {
            id,
            definition,
            metadata,
        }
    }

    /// Identifier assigned by the store.
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn definition(&self) -> &TilePyramidRegionDefinition {
        &self.definition
    }

    pub fn metadata(&self) -> &[u8] {
        &self.metadata
    }
}

/// Whether a region is currently downloading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DownloadState {
    /// Not downloading; previously downloaded resources remain available.
    #[default]
    Inactive,
    /// Resources are being (or will be) downloaded when network is available.
    Active,
}

/// Progress of an offline region.
///
/// The cache fills in the completed figures from the current pin set; the
/// required figures belong to whoever drives the download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfflineRegionStatus {
    pub download_state: DownloadState,
    /// Number of pinned resources and tiles that have a stored payload.
    pub completed_resource_count: u64,
    /// Stored bytes of those resources and tiles.
    pub completed_resource_size: u64,
    /// Number of resources known to be required.
    pub required_resource_count: u64,
    /// False while the required count is only a lower bound (before the style
    /// and sources have been fetched).
    pub required_resource_count_is_precise: bool,
}

impl Default for OfflineRegionStatus {
    fn default() -> Self {
        Self {
            download_state: DownloadState::Inactive,
            completed_resource_count: 0,
            completed_resource_size: 0,
            required_resource_count: 0,
            required_resource_count_is_precise: false,
        }
    }
}

impl OfflineRegionStatus {
    /// All required resources have completed.
    pub fn complete(&self) -> bool {
        self.completed_resource_count == self.required_resource_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offline::LatLngBounds;

    #[test]
    fn test_region_accessors() {
        let definition =
            TilePyramidRegionDefinition::new("s", LatLngBounds::world(), 0.0, 1.0, 1.0).unwrap();
        let region = OfflineRegion::new(7, definition.clone(), b"meta".to_vec());

        assert_eq!(region.id(), 7);
        assert_eq!(region.definition(), &definition);
        assert_eq!(region.metadata(), b"meta");
    }

    #[test]
    fn test_status_default() {
        let status = OfflineRegionStatus::default();
        assert_eq!(status.download_state, DownloadState::Inactive);
        assert_eq!(status.completed_resource_count, 0);
        assert!(!status.required_resource_count_is_precise);
        assert!(status.complete());
    }

    #[test]
    fn test_status_complete() {
        let mut status = OfflineRegionStatus {
            completed_resource_count: 3,
            required_resource_count: 5,
            ..Default::default()
        };
        assert!(!status.complete());

        status.completed_resource_count = 5;
        assert!(status.complete());
    }
}
