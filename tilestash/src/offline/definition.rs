//! Tile-pyramid region definitions and their private, versioned encoding.
//!
//! The encoded bytes are stored in the `regions.definition` column. Callers
//! must treat them as opaque: only [`encode_region_definition`] and
//! [`decode_region_definition`] know the layout.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current encoding version written by [`encode_region_definition`].
pub const DEFINITION_ENCODING_VERSION: u32 = 1;

/// Errors from constructing or decoding a region definition.
#[derive(Debug, Error)]
pub enum DefinitionError {
    /// The stored bytes are not a valid encoding
    #[error("Malformed region definition: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The bytes were written by a newer encoder
    #[error("Unsupported region definition version {found} (newest supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// Field values violate the definition constraints
    #[error("Invalid region definition: {0}")]
    Invalid(String),
}

/// Geographic bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLngBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl LatLngBounds {
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south,
            west,
            north,
            east,
        }
    }

    /// Bounds covering the whole world.
    pub fn world() -> Self {
        Self::new(-90.0, -180.0, 90.0, 180.0)
    }
}

/// An offline region defined by a style URL, bounding box, zoom range and
/// pixel ratio.
///
/// `max_zoom` may be `f64::INFINITY`, meaning "up to the maximum zoom each
/// tile source provides".
#[derive(Debug, Clone, PartialEq)]
pub struct TilePyramidRegionDefinition {
    pub style_url: String,
    pub bounds: LatLngBounds,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub pixel_ratio: f32,
}

impl TilePyramidRegionDefinition {
    /// Create a validated definition.
    ///
    /// Requires `min_zoom >= 0`, `max_zoom >= min_zoom` and `pixel_ratio >= 0`.
    pub fn new(
        style_url: impl Into<String>,
        bounds: LatLngBounds,
        min_zoom: f64,
        max_zoom: f64,
        pixel_ratio: f32,
    ) -> Result<Self, DefinitionError> {
        let definition = Self {
            style_url: style_url.into(),
            bounds,
            min_zoom,
            max_zoom,
            pixel_ratio,
        };
        definition.validate()?;
        Ok(definition)
    }

    fn validate(&self) -> Result<(), DefinitionError> {
        if self.min_zoom.is_nan() || self.min_zoom < 0.0 {
            return Err(DefinitionError::Invalid(format!(
                "min_zoom must be >= 0, got {}",
                self.min_zoom
            )));
        }
        if self.max_zoom.is_nan() || self.max_zoom < self.min_zoom {
            return Err(DefinitionError::Invalid(format!(
                "max_zoom must be >= min_zoom ({}), got {}",
                self.min_zoom, self.max_zoom
            )));
        }
        if self.pixel_ratio.is_nan() || self.pixel_ratio < 0.0 {
            return Err(DefinitionError::Invalid(format!(
                "pixel_ratio must be >= 0, got {}",
                self.pixel_ratio
            )));
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct EncodedDefinition {
    #[serde(default = "first_version")]
    version: u32,
    style_url: String,
    /// south, west, north, east
    bounds: [f64; 4],
    min_zoom: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_zoom: Option<f64>,
    pixel_ratio: f32,
}

fn first_version() -> u32 {
    1
}

/// Encode a definition for storage.
pub fn encode_region_definition(
    definition: &TilePyramidRegionDefinition,
) -> Result<Vec<u8>, DefinitionError> {
    let bounds = definition.bounds;
    let encoded = EncodedDefinition {
        version: DEFINITION_ENCODING_VERSION,
        style_url: definition.style_url.clone(),
        bounds: [bounds.south, bounds.west, bounds.north, bounds.east],
        min_zoom: definition.min_zoom,
        // JSON has no infinity
        max_zoom: definition
            .max_zoom
            .is_finite()
            .then_some(definition.max_zoom),
        pixel_ratio: definition.pixel_ratio,
    };
    Ok(serde_json::to_vec(&encoded)?)
}

/// Decode a definition previously produced by [`encode_region_definition`].
pub fn decode_region_definition(bytes: &[u8]) -> Result<TilePyramidRegionDefinition, DefinitionError> {
    let encoded: EncodedDefinition = serde_json::from_slice(bytes)?;
    if encoded.version > DEFINITION_ENCODING_VERSION {
        return Err(DefinitionError::UnsupportedVersion {
            found: encoded.version,
            supported: DEFINITION_ENCODING_VERSION,
        });
    }

    let [south, west, north, east] = encoded.bounds;
    TilePyramidRegionDefinition::new(
        encoded.style_url,
        LatLngBounds::new(south, west, north, east),
        encoded.min_zoom,
        encoded.max_zoom.unwrap_or(f64::INFINITY),
        encoded.pixel_ratio,
    )
}
