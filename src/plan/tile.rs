//! A single planned crop of a single source image.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{PlanError, StorageError};
use crate::geometry::CropSpec;
use crate::io::{write_atomic, ImageSource, RateLimiter};

/// Rotation and quality path segments shared by every Level 0 request.
const TILE_SUFFIX: &str = "0/default.jpg";

/// Outcome of [`TileRecord::materialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Materialized {
    /// File was already on disk; no request was made
    Existing,
    /// File was fetched and written
    Fetched,
}

/// A crop bound to a source image URL and a local image directory.
///
/// Records are never mutated after planning. Existence is checked against
/// the filesystem on every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRecord {
    source_url: String,
    image_path: PathBuf,
    crop: CropSpec,
}

impl TileRecord {
    /// Create a record for `crop` of the image at `source_url`, stored under `image_path`.
    pub fn new(source_url: impl Into<String>, image_path: impl Into<PathBuf>, crop: CropSpec) -> Self {
        Self {
            source_url: source_url.into(),
            image_path: image_path.into(),
            crop,
        }
    }

    pub fn crop(&self) -> &CropSpec {
        &self.crop
    }

    /// Origin URL: `{source}/{region}/{size}/0/default.jpg`.
    pub fn url(&self) -> String {
        format!("{}/{}/{}", self.source_url, self.crop, TILE_SUFFIX)
    }

    /// Local file: `{image}/{region}/{size}/0/default.jpg`.
    pub fn path(&self) -> PathBuf {
        self.image_path.join(self.crop.path()).join(TILE_SUFFIX)
    }

    /// Immediate parent directory of the file.
    pub fn dir(&self) -> PathBuf {
        let path = self.path();
        path.parent().map(Path::to_path_buf).unwrap_or(path)
    }

    /// Top-level region directory this tile lives under.
    pub fn top_path(&self) -> PathBuf {
        self.image_path.join(self.crop.region().to_string())
    }

    pub fn exists(&self) -> bool {
        self.path().is_file()
    }

    /// Fetch and write the tile unless it is already on disk.
    pub async fn materialize<S: ImageSource + ?Sized>(
        &self,
        source: &S,
        limiter: &RateLimiter,
    ) -> Result<Materialized, PlanError> {
        if self.exists() {
            debug!(crop = %self.crop, "Tile exists, skipping");
            return Ok(Materialized::Existing);
        }

        limiter.acquire().await;

        let url = self.url();
        let data = source.fetch(&url).await?;
        write_atomic(&self.path(), &data).await?;

        debug!(crop = %self.crop, bytes = data.len(), "Tile written");
        Ok(Materialized::Fetched)
    }

    /// Remove the tile's whole top-level region directory.
    ///
    /// Other crops sharing the same region go with it.
    pub fn clean(&self) -> Result<(), StorageError> {
        if !self.exists() {
            return Ok(());
        }
        let top = self.top_path();
        std::fs::remove_dir_all(&top).map_err(|e| StorageError::io(top, e))
    }
}
