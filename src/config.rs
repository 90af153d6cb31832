//! Configuration for a conversion run.
//!
//! Two sources feed a run:
//! - Command-line arguments via clap (with `IIIF_` environment fallbacks)
//! - A JSON targets file listing the source images
//!
//! # Targets File
//!
//! ```json
//! [
//!   {"url": "https://example.org/iiif/img1", "identifier": "img1"},
//!   {
//!     "url": "https://example.org/iiif/img2",
//!     "identifier": "img2",
//!     "custom_tiles": [
//!       {"region_x": 10, "region_y": 40, "region_w": 45, "region_h": 60, "size_w": 20}
//!     ]
//!   }
//! ]
//! ```
//!
//! # Environment Variables
//!
//! - `IIIF_OUTPUT` - Destination directory (must exist)
//! - `IIIF_TARGETS` - Targets JSON file (must exist)
//! - `IIIF_DOMAIN` - Base URL for `@id` (default: http://localhost)
//! - `IIIF_TILE_SIZE` - Tile size in pixels (default: 512)
//! - `IIIF_SLEEP` - Seconds between requests to the origin (default: 0)
//! - `IIIF_CONCURRENCY` - Concurrent tile requests per image (default: 4)
//! - `IIIF_TIMEOUT` - Request timeout in seconds (default: 30)

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;
use url::Url;

use crate::error::ConfigError;
use crate::geometry::{CropSpec, Region, Size};
use crate::io::DEFAULT_TIMEOUT_SECS;
use crate::plan::DEFAULT_CONCURRENCY;

// =============================================================================
// Default Values
// =============================================================================

/// Default base URL for rewritten descriptors.
pub const DEFAULT_DOMAIN: &str = "http://localhost";

/// Default tile size in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 512;

// =============================================================================
// CLI Arguments
// =============================================================================

/// IIIF Image API Level 0 static file generator.
///
/// Fetches every tile, preview and full-size variant a Level 0 client needs
/// from a dynamic IIIF server and writes them, with a rewritten info.json,
/// under the output directory. Re-running resumes where the last run stopped.
#[derive(Parser, Debug, Clone)]
#[command(name = "iiif-level0")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Destination directory for tiles (must already exist).
    #[arg(short, long, env = "IIIF_OUTPUT")]
    pub output: PathBuf,

    /// JSON file listing the source images.
    #[arg(short, long, env = "IIIF_TARGETS")]
    pub targets: PathBuf,

    /// Domain and base path used in the '@id' of every rewritten descriptor.
    #[arg(long, default_value = DEFAULT_DOMAIN, env = "IIIF_DOMAIN")]
    pub domain: String,

    /// Tile size in pixels.
    #[arg(short = 's', long = "size", default_value_t = DEFAULT_TILE_SIZE, env = "IIIF_TILE_SIZE")]
    pub tile_size: u32,

    /// Delete every target's output directory and start over.
    #[arg(long, default_value_t = false)]
    pub clean: bool,

    /// Delete previously downloaded tiles that are no longer planned.
    #[arg(long, default_value_t = false)]
    pub prune: bool,

    /// Seconds to wait between requests to the origin server.
    #[arg(long, default_value_t = 0.0, env = "IIIF_SLEEP")]
    pub sleep: f64,

    /// Maximum concurrent tile requests per image.
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY, env = "IIIF_CONCURRENCY")]
    pub concurrency: usize,

    /// Request timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, env = "IIIF_TIMEOUT")]
    pub timeout: u64,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Config {
    /// Validate the configuration before any network activity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.output.is_dir() {
            return Err(ConfigError::OutputDirMissing(self.output.clone()));
        }
        if !self.targets.is_file() {
            return Err(ConfigError::TargetsFileMissing(self.targets.clone()));
        }
        if self.tile_size == 0 {
            return Err(ConfigError::InvalidTileSize(self.tile_size));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::NotPositive {
                name: "concurrency",
            });
        }
        if self.timeout == 0 {
            return Err(ConfigError::NotPositive { name: "timeout" });
        }
        if Duration::try_from_secs_f64(self.sleep).is_err() {
            return Err(ConfigError::InvalidSleep(self.sleep));
        }

        Url::parse(&self.domain).map_err(|e| ConfigError::InvalidDomain {
            domain: self.domain.clone(),
            message: e.to_string(),
        })?;

        Ok(())
    }

    /// Domain without a trailing slash.
    pub fn normalized_domain(&self) -> &str {
        self.domain.trim_end_matches('/')
    }

    /// Delay between origin requests.
    ///
    /// Zero when `sleep` is out of range; `validate` rejects such values.
    pub fn sleep_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.sleep).unwrap_or(Duration::ZERO)
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

// =============================================================================
// Targets File
// =============================================================================

/// A custom crop as written in the targets file.
///
/// The region is either fully given (`x`, `y`, `w`, `h`) or fully omitted,
/// meaning the whole image. Either size side may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CropSpecInput {
    #[serde(default)]
    pub region_x: Option<u32>,
    #[serde(default)]
    pub region_y: Option<u32>,
    #[serde(default)]
    pub region_w: Option<u32>,
    #[serde(default)]
    pub region_h: Option<u32>,
    #[serde(default)]
    pub size_w: Option<u32>,
    #[serde(default)]
    pub size_h: Option<u32>,
}

impl CropSpecInput {
    /// Convert into a [`CropSpec`], rejecting partially specified regions.
    pub fn to_crop(&self, identifier: &str) -> Result<CropSpec, ConfigError> {
        let region = match (self.region_x, self.region_y, self.region_w, self.region_h) {
            (Some(x), Some(y), Some(w), Some(h)) => {
                if w == 0 || h == 0 {
                    return Err(ConfigError::InvalidCrop {
                        identifier: identifier.to_string(),
                        message: "region width and height must be greater than 0".to_string(),
                    });
                }
                Region::rect(x, y, w, h)
            }
            (None, None, None, None) => Region::Full,
            _ => {
                return Err(ConfigError::InvalidCrop {
                    identifier: identifier.to_string(),
                    message: "region_x, region_y, region_w and region_h must be given together"
                        .to_string(),
                })
            }
        };

        let size = Size {
            width: self.size_w,
            height: self.size_h,
        };

        Ok(CropSpec::new(region, size))
    }
}

/// One source image to convert.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TargetSpec {
    /// Base URL of the image on the origin IIIF server
    pub url: String,

    /// Directory name and `@id` suffix for the output
    pub identifier: String,

    #[serde(default)]
    pub custom_tiles: Vec<CropSpecInput>,
}

impl TargetSpec {
    /// Source URL without a trailing slash.
    pub fn normalized_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// Custom crops in file order.
    pub fn crops(&self) -> Result<Vec<CropSpec>, ConfigError> {
        self.custom_tiles
            .iter()
            .map(|c| c.to_crop(&self.identifier))
            .collect()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let id = self.identifier.as_str();
        if id.is_empty()
            || id == "."
            || id.contains("..")
            || id.contains('/')
            || id.contains('\\')
        {
            return Err(ConfigError::InvalidIdentifier(self.identifier.clone()));
        }

        Url::parse(&self.url).map_err(|e| ConfigError::InvalidSourceUrl {
            identifier: self.identifier.clone(),
            url: self.url.clone(),
            message: e.to_string(),
        })?;

        self.crops().map(|_| ())
    }
}

/// Read and validate the targets file.
pub fn load_targets(path: &Path) -> Result<Vec<TargetSpec>, ConfigError> {
    let body = std::fs::read(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    parse_targets(path, &body)
}

/// Parse and validate a targets document.
pub fn parse_targets(path: &Path, body: &[u8]) -> Result<Vec<TargetSpec>, ConfigError> {
    let targets: Vec<TargetSpec> =
        serde_json::from_slice(body).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let mut seen = HashSet::new();
    for target in &targets {
        target.validate()?;
        if !seen.insert(target.identifier.as_str()) {
            return Err(ConfigError::DuplicateIdentifier(target.identifier.clone()));
        }
    }

    Ok(targets)
}

// =============================================================================
// Tests
// =============================================================================
