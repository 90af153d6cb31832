//! IIIF image descriptors (`info.json`).
//!
//! The origin server's descriptor is read into a [`SourceInfo`], which only
//! keeps the fields a Level 0 rewrite needs. [`translate_info`] turns it into a
//! [`Level0Info`] that points at the destination domain and advertises the
//! exact sizes and tiles that get materialized on disk.
//!
//! # Example Output
//!
//! ```json
//! {
//!   "@context": "http://iiif.io/api/image/2/context.json",
//!   "@id": "http://localhost/img",
//!   "profile": [
//!     "http://iiif.io/api/image/2/level0.json",
//!     {"formats": ["jpg"], "qualities": ["default"]}
//!   ],
//!   "protocol": "http://iiif.io/api/image",
//!   "sizes": [{"width": 16, "height": "full"}],
//!   "tiles": [{"scaleFactors": [1], "width": 256}],
//!   "width": 487,
//!   "height": 640
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FetchError, StorageError};
use crate::geometry::{downsize_levels, scaling_factors};

pub const IIIF_CONTEXT: &str = "http://iiif.io/api/image/2/context.json";
pub const IIIF_PROTOCOL: &str = "http://iiif.io/api/image";
pub const LEVEL0_PROFILE: &str = "http://iiif.io/api/image/2/level0.json";

// =============================================================================
// Source descriptor
// =============================================================================

/// The fields of an origin `info.json` needed to plan a Level 0 tile set.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceInfo {
    pub width: u32,
    pub height: u32,

    #[serde(rename = "maxWidth", default)]
    pub max_width: Option<u32>,

    #[serde(rename = "maxHeight", default)]
    pub max_height: Option<u32>,
}

impl SourceInfo {
    /// Parse an origin descriptor body.
    pub fn from_slice(url: &str, body: &[u8]) -> Result<Self, FetchError> {
        serde_json::from_slice(body).map_err(|e| FetchError::InvalidDescriptor {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

// =============================================================================
// Level 0 descriptor
// =============================================================================

/// One entry of the `profile` array: either a compliance URI or a feature block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProfileEntry {
    Uri(String),
    Features {
        formats: Vec<String>,
        qualities: Vec<String>,
    },
}

/// A whole-image preview advertised in `sizes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeEntry {
    pub width: u32,
    pub height: String,
}

/// The tile pyramid advertised in `tiles`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileEntry {
    #[serde(rename = "scaleFactors")]
    pub scale_factors: Vec<u32>,
    pub width: u32,
}

/// Rewritten descriptor served next to the static tiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level0Info {
    #[serde(rename = "@context")]
    pub context: String,

    #[serde(rename = "@id")]
    pub id: String,

    pub profile: Vec<ProfileEntry>,
    pub protocol: String,
    pub sizes: Vec<SizeEntry>,
    pub tiles: Vec<TileEntry>,
    pub width: u32,
    pub height: u32,

    #[serde(rename = "maxWidth", default, skip_serializing_if = "Option::is_none")]
    pub max_width: Option<u32>,

    #[serde(rename = "maxHeight", default, skip_serializing_if = "Option::is_none")]
    pub max_height: Option<u32>,
}

/// Build the Level 0 descriptor for `source`, published at `{domain}/{identifier}`.
pub fn translate_info(
    source: &SourceInfo,
    domain: &str,
    identifier: &str,
    tile_size: u32,
) -> Level0Info {
    let sizes = downsize_levels(source.width)
        .into_iter()
        .map(|width| SizeEntry {
            width,
            height: "full".to_string(),
        })
        .collect();

    let tiles = vec![TileEntry {
        scale_factors: scaling_factors(source.width.min(source.height), tile_size),
        width: tile_size,
    }];

    Level0Info {
        context: IIIF_CONTEXT.to_string(),
        id: format!("{}/{}", domain, identifier),
        profile: vec![
            ProfileEntry::Uri(LEVEL0_PROFILE.to_string()),
            ProfileEntry::Features {
                formats: vec!["jpg".to_string()],
                qualities: vec!["default".to_string()],
            },
        ],
        protocol: IIIF_PROTOCOL.to_string(),
        sizes,
        tiles,
        width: source.width,
        height: source.height,
        max_width: source.max_width,
        max_height: source.max_height,
    }
}

impl Level0Info {
    /// Read a cached descriptor.
    pub fn read_from(path: &Path) -> Result<Self, StorageError> {
        let body = fs::read(path).map_err(|e| StorageError::io(path, e))?;
        serde_json::from_slice(&body).map_err(|e| StorageError::Json {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Write the descriptor, replacing any existing file atomically.
    pub async fn write_to(&self, path: &Path) -> Result<(), StorageError> {
        let body = serde_json::to_vec(self).map_err(|e| StorageError::Json {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        crate::io::write_atomic(path, &body).await
    }
}
