//! Resource identities.
//!
//! A resource is either a generic asset addressed by URL (styles, sources,
//! glyphs, sprites) or a map tile addressed by its template and coordinates.
//! The two kinds live in separate tables and never share an identity.

use std::fmt;

/// Kind of a fetchable resource.
///
/// The discriminant is persisted in the `kind` column of the resources table,
/// so the numbering must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Unknown = 0,
    Style = 1,
    Source = 2,
    Tile = 3,
    Glyphs = 4,
    SpriteImage = 5,
    SpriteJson = 6,
}

impl ResourceKind {
    /// Stored integer representation.
    pub fn as_i64(self) -> i64 {
        self as i64
    }

    /// Parse a stored integer; unrecognized values map to `Unknown`.
    pub fn from_i64(value: i64) -> Self {
        match value {
            1 => Self::Style,
            2 => Self::Source,
            3 => Self::Tile,
            4 => Self::Glyphs,
            5 => Self::SpriteImage,
            6 => Self::SpriteJson,
            _ => Self::Unknown,
        }
    }
}

/// Identity of a tile resource.
///
/// All five fields form the unique key: two tiles differing only in
/// `pixel_ratio` are distinct entries.
#[derive(Debug, Clone, PartialEq)]
pub struct TileData {
    /// URL template the tile was expanded from (e.g. `https://host/{z}/{x}/{y}.pbf`)
    pub url_template: String,
    /// Device pixel ratio the tile was requested for
    pub pixel_ratio: f32,
    pub x: i32,
    pub y: i32,
    pub z: i8,
}

/// Identity of a cached resource.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    /// A URL-keyed asset.
    Generic { kind: ResourceKind, url: String },
    /// A coordinate-keyed tile.
    Tile(TileData),
}

impl Resource {
    /// Create a generic resource of the given kind.
    pub fn generic(kind: ResourceKind, url: impl Into<String>) -> Self {
        Self::Generic {
            kind,
            url: url.into(),
        }
    }

    pub fn style(url: impl Into<String>) -> Self {
        Self::generic(ResourceKind::Style, url)
    }

    pub fn source(url: impl Into<String>) -> Self {
        Self::generic(ResourceKind::Source, url)
    }

    pub fn glyphs(url: impl Into<String>) -> Self {
        Self::generic(ResourceKind::Glyphs, url)
    }

    pub fn sprite_image(url: impl Into<String>) -> Self {
        Self::generic(ResourceKind::SpriteImage, url)
    }

    pub fn sprite_json(url: impl Into<String>) -> Self {
        Self::generic(ResourceKind::SpriteJson, url)
    }

    /// Create a tile resource.
    pub fn tile(url_template: impl Into<String>, pixel_ratio: f32, x: i32, y: i32, z: i8) -> Self {
        Self::Tile(TileData {
            url_template: url_template.into(),
            pixel_ratio,
            x,
            y,
            z,
        })
    }

    /// Kind of this resource.
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Generic { kind, .. } => *kind,
            Self::Tile(_) => ResourceKind::Tile,
        }
    }

    /// Whether this resource is keyed by tile coordinates.
    pub fn is_tile(&self) -> bool {
        matches!(self, Self::Tile(_))
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generic { url, .. } => write!(f, "{}", url),
            Self::Tile(tile) => write!(
                f,
                "{} @{}x z={} x={} y={}",
                tile.url_template, tile.pixel_ratio, tile.z, tile.x, tile.y
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_roundtrip_through_storage() {
        for kind in [
            ResourceKind::Unknown,
            ResourceKind::Style,
            ResourceKind::Source,
            ResourceKind::Tile,
            ResourceKind::Glyphs,
            ResourceKind::SpriteImage,
            ResourceKind::SpriteJson,
        ] {
            assert_eq!(ResourceKind::from_i64(kind.as_i64()), kind);
        }
    }

    #[test]
    fn test_unrecognized_kind_is_unknown() {
        assert_eq!(ResourceKind::from_i64(42), ResourceKind::Unknown);
        assert_eq!(ResourceKind::from_i64(-1), ResourceKind::Unknown);
    }

    #[test]
    fn test_tile_kind() {
        let tile = Resource::tile("https://t/{z}/{x}/{y}", 1.0, 1, 2, 3);
        assert_eq!(tile.kind(), ResourceKind::Tile);
        assert!(tile.is_tile());

        let style = Resource::style("https://s/style.json");
        assert_eq!(style.kind(), ResourceKind::Style);
        assert!(!style.is_tile());
    }

    #[test]
    fn test_pixel_ratio_distinguishes_tiles() {
        let a = Resource::tile("https://t/{z}/{x}/{y}", 1.0, 0, 0, 0);
        let b = Resource::tile("https://t/{z}/{x}/{y}", 2.0, 0, 0, 0);
        assert_ne!(a, b);
    }

    #[test]
    fn test_display() {
        let tile = Resource::tile("https://t/{z}/{x}/{y}", 2.0, 5, 6, 7);
        assert_eq!(tile.to_string(), "https://t/{z}/{x}/{y} @2x z=7 x=5 y=6");
        assert_eq!(Resource::glyphs("https://g").to_string(), "https://g");
    }
}
