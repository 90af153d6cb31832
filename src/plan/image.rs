//! Per-image plan: descriptor state plus every crop to materialize.
//!
//! # Lifecycle
//!
//! ```text
//! ImagePlan::new ──► initialize() ──► fetch_missing() ──► is_complete()
//!                     │                 │
//!                     │ info.json       │ tiles fetched only when their
//!                     │ (cached once)   │ file is absent on disk
//!                     ▼                 ▼
//!               {output}/{id}/info.json  {output}/{id}/{region}/{size}/0/default.jpg
//! ```
//!
//! Completion is never tracked in memory. Every query re-checks the
//! filesystem, so a fresh process rebuilds the same plan and resumes where the
//! previous run stopped.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::descriptor::{translate_info, Level0Info, SourceInfo};
use crate::error::{FetchError, PlanError, StorageError};
use crate::geometry::{default_tile_grid, downsize_crops, full_size_crop, CropSpec};
use crate::io::{ImageSource, RateLimiter};

use super::tile::{Materialized, TileRecord};

/// Name of the descriptor file inside each image directory.
pub const INFO_FILE: &str = "info.json";

/// Default number of in-flight tile fetches per image.
pub const DEFAULT_CONCURRENCY: usize = 4;

// =============================================================================
// Fetch options and results
// =============================================================================

/// Settings shared by every fetch of a run.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Maximum concurrent tile requests per image
    pub concurrency: usize,

    /// Spacing between requests to the origin, shared across images
    pub limiter: Arc<RateLimiter>,

    /// Stops new fetches from being issued once triggered
    pub cancel: CancellationToken,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            limiter: Arc::new(RateLimiter::unlimited()),
            cancel: CancellationToken::new(),
        }
    }
}

/// A tile that could not be materialized.
#[derive(Debug, Clone)]
pub struct TileFailure {
    pub identifier: String,
    pub crop: CropSpec,
    pub url: String,
    pub error: PlanError,
}

/// Counters from one [`ImagePlan::fetch_missing`] pass.
#[derive(Debug, Clone, Default)]
pub struct FetchSummary {
    /// Tiles requested and written
    pub fetched: usize,

    /// Tiles already on disk
    pub skipped: usize,

    /// Tiles that failed, in completion order
    pub failures: Vec<TileFailure>,

    /// Whether cancellation stopped the pass early
    pub cancelled: bool,
}

// =============================================================================
// ImagePlan
// =============================================================================

/// One source image and the full list of crops it needs.
#[derive(Debug, Clone)]
pub struct ImagePlan {
    identifier: String,
    source_url: String,
    domain: String,
    output_root: PathBuf,
    tile_size: u32,
    custom_crops: Vec<CropSpec>,
    info: Option<Level0Info>,
    tiles: Vec<TileRecord>,
    initialized: bool,
}

impl ImagePlan {
    /// Create an uninitialized plan.
    ///
    /// # Arguments
    /// * `identifier` - Directory name under `output_root` and last segment of `@id`
    /// * `source_url` - Base URL of the image on the origin server (no trailing `/`)
    /// * `output_root` - Directory holding every image of the batch
    /// * `domain` - Base URL the static files will be served from
    /// * `tile_size` - Tile width in pixels, must be > 0
    pub fn new(
        identifier: impl Into<String>,
        source_url: impl Into<String>,
        output_root: impl Into<PathBuf>,
        domain: impl Into<String>,
        tile_size: u32,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            source_url: source_url.into(),
            domain: domain.into(),
            output_root: output_root.into(),
            tile_size,
            custom_crops: Vec::new(),
            info: None,
            tiles: Vec::new(),
            initialized: false,
        }
    }

    /// Add caller-supplied crops, planned after the default ones.
    pub fn with_custom_crops(mut self, crops: Vec<CropSpec>) -> Self {
        self.custom_crops = crops;
        self
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn custom_crops(&self) -> &[CropSpec] {
        &self.custom_crops
    }

    /// Descriptor, once loaded by [`initialize`](Self::initialize).
    pub fn info(&self) -> Option<&Level0Info> {
        self.info.as_ref()
    }

    /// Planned records in planning order.
    pub fn tiles(&self) -> &[TileRecord] {
        &self.tiles
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Directory holding this image's descriptor and tiles.
    pub fn path(&self) -> PathBuf {
        self.output_root.join(&self.identifier)
    }

    pub fn info_path(&self) -> PathBuf {
        self.path().join(INFO_FILE)
    }

    /// Published `@id`: `{domain}/{identifier}`.
    pub fn id_url(&self) -> String {
        format!("{}/{}", self.domain, self.identifier)
    }

    /// Published descriptor URL.
    pub fn info_url(&self) -> String {
        format!("{}/{}", self.id_url(), INFO_FILE)
    }

    /// Origin descriptor URL.
    pub fn source_info_url(&self) -> String {
        format!("{}/{}", self.source_url, INFO_FILE)
    }

    pub fn exists(&self) -> bool {
        self.path().exists()
    }

    pub fn make_dir(&self) -> Result<(), StorageError> {
        let path = self.path();
        std::fs::create_dir_all(&path).map_err(|e| StorageError::io(path, e))
    }

    /// Delete this image's whole output directory.
    pub fn clean(&self) -> Result<(), StorageError> {
        let path = self.path();
        if !path.exists() {
            return Ok(());
        }
        std::fs::remove_dir_all(&path).map_err(|e| StorageError::io(path, e))
    }

    /// Load the descriptor and plan every crop.
    ///
    /// The descriptor is fetched from the origin only when no cached
    /// `info.json` exists. On error the plan stays uninitialized with no
    /// records. A second call returns [`PlanError::AlreadyInitialized`].
    pub async fn initialize<S: ImageSource + ?Sized>(&mut self, source: &S) -> Result<(), PlanError> {
        self.initialize_with(source, &RateLimiter::unlimited()).await
    }

    /// [`initialize`](Self::initialize), spacing the descriptor request through `limiter`.
    pub async fn initialize_with<S: ImageSource + ?Sized>(
        &mut self,
        source: &S,
        limiter: &RateLimiter,
    ) -> Result<(), PlanError> {
        if self.initialized {
            return Err(PlanError::AlreadyInitialized(self.identifier.clone()));
        }

        let info = self.load_info(source, limiter).await?;

        let crops = std::iter::once(full_size_crop())
            .chain(downsize_crops(info.width))
            .chain(default_tile_grid(info.width, info.height, self.tile_size))
            .chain(self.custom_crops.iter().copied());

        // One record per crop; a repeated crop keeps its first position.
        let mut seen = HashSet::new();
        let tiles: Vec<TileRecord> = crops
            .filter(|crop| seen.insert(*crop))
            .map(|crop| self.record(crop))
            .collect();

        info!(
            identifier = %self.identifier,
            width = info.width,
            height = info.height,
            tiles = tiles.len(),
            "Image planned"
        );

        self.tiles = tiles;
        self.info = Some(info);
        self.initialized = true;
        Ok(())
    }

    fn record(&self, crop: CropSpec) -> TileRecord {
        TileRecord::new(self.source_url.clone(), self.path(), crop)
    }

    /// Read the cached descriptor, fetching and rewriting it first if absent.
    async fn load_info<S: ImageSource + ?Sized>(
        &self,
        source: &S,
        limiter: &RateLimiter,
    ) -> Result<Level0Info, PlanError> {
        let info_path = self.info_path();

        if !info_path.is_file() {
            limiter.acquire().await;
            let url = self.source_info_url();
            debug!(identifier = %self.identifier, url = %url, "Fetching descriptor");

            let body = source.fetch(&url).await?;
            let source_info = SourceInfo::from_slice(&url, &body)?;
            let level0 = translate_info(&source_info, &self.domain, &self.identifier, self.tile_size);
            level0.write_to(&info_path).await?;
        }

        Ok(Level0Info::read_from(&info_path)?)
    }

    /// Number of planned records whose file is not on disk.
    pub fn pending_count(&self) -> usize {
        self.tiles.iter().filter(|t| !t.exists()).count()
    }

    /// Whether every planned file and the descriptor exist on disk.
    pub fn is_complete(&self) -> bool {
        self.info_path().is_file() && self.tiles.iter().all(TileRecord::exists)
    }

    /// Fetch every planned tile that is not on disk yet.
    ///
    /// A failed tile is recorded in the summary and the remaining tiles are
    /// still attempted. Returns once all in-flight fetches have settled.
    pub async fn fetch_missing<S: ImageSource + 'static>(
        &self,
        source: Arc<S>,
        options: &FetchOptions,
    ) -> Result<FetchSummary, PlanError> {
        if !self.initialized {
            return Err(PlanError::NotInitialized(self.identifier.clone()));
        }

        let mut summary = FetchSummary::default();
        let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
        let mut fetches = JoinSet::new();
        let mut in_flight: HashMap<PathBuf, TileRecord> = HashMap::new();

        for tile in &self.tiles {
            if tile.exists() {
                summary.skipped += 1;
                continue;
            }

            if options.cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            let permit = tokio::select! {
                biased;
                _ = options.cancel.cancelled() => {
                    summary.cancelled = true;
                    break;
                }
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            in_flight.insert(tile.path(), tile.clone());
            let tile = tile.clone();
            let source = Arc::clone(&source);
            let limiter = Arc::clone(&options.limiter);
            let cancel = options.cancel.clone();

            fetches.spawn(async move {
                let _permit = permit;
                let result = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(PlanError::Fetch(FetchError::Cancelled)),
                    result = tile.materialize(source.as_ref(), &limiter) => result,
                };
                (tile, result)
            });
        }

        while let Some(joined) = fetches.join_next().await {
            let (tile, result) = match joined {
                Ok(done) => done,
                Err(join_err) => {
                    warn!(identifier = %self.identifier, error = %join_err, "Tile task panicked");
                    continue;
                }
            };
            in_flight.remove(&tile.path());

            match result {
                Ok(Materialized::Fetched) => summary.fetched += 1,
                Ok(Materialized::Existing) => summary.skipped += 1,
                Err(PlanError::Fetch(FetchError::Cancelled)) => summary.cancelled = true,
                Err(error) => summary.failures.push(self.failure(&tile, error)),
            }
        }

        // Tasks that never handed their tile back panicked.
        for tile in in_flight.into_values() {
            summary
                .failures
                .push(self.failure(&tile, PlanError::TaskPanicked));
        }

        info!(
            identifier = %self.identifier,
            fetched = summary.fetched,
            skipped = summary.skipped,
            failed = summary.failures.len(),
            "Image fetch pass finished"
        );

        Ok(summary)
    }

    fn failure(&self, tile: &TileRecord, error: PlanError) -> TileFailure {
        warn!(
            identifier = %self.identifier,
            crop = %tile.crop(),
            error = %error,
            "Tile failed"
        );
        TileFailure {
            identifier: self.identifier.clone(),
            crop: *tile.crop(),
            url: tile.url(),
            error,
        }
    }

    /// Delete `.jpg` files under the image directory that are no longer planned.
    ///
    /// Returns the number of files removed. Used when custom crops change
    /// between runs.
    pub fn prune(&self) -> Result<usize, PlanError> {
        if !self.initialized {
            return Err(PlanError::NotInitialized(self.identifier.clone()));
        }

        let root = self.path();
        if !root.exists() {
            return Ok(0);
        }

        let planned: HashSet<PathBuf> = self.tiles.iter().map(TileRecord::path).collect();
        let mut removed = 0;

        for entry in WalkDir::new(&root) {
            let entry = entry.map_err(|e| StorageError::Io {
                path: e.path().map(|p| p.to_path_buf()).unwrap_or_else(|| root.clone()),
                message: e.to_string(),
            })?;

            let path = entry.path();
            let is_jpg = path.extension().map(|ext| ext == "jpg").unwrap_or(false);
            if !entry.file_type().is_file() || !is_jpg || planned.contains(path) {
                continue;
            }

            std::fs::remove_file(path).map_err(|e| StorageError::io(path, e))?;
            debug!(identifier = %self.identifier, path = %path.display(), "Pruned");
            removed += 1;
        }

        Ok(removed)
    }
}
