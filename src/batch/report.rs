use std::fmt;

use crate::error::PlanError;
use crate::plan::{FetchSummary, TileFailure};

/// An image whose descriptor or plan could not be built.
#[derive(Debug, Clone)]
pub struct ImageFailure {
    pub identifier: String,
    pub error: PlanError,
}

impl fmt::Display for ImageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.identifier, self.error)
    }
}

impl fmt::Display for TileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.identifier, self.crop, self.error)
    }
}

/// Totals and failures collected across a batch.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Tiles fetched and written
    pub fetched: usize,

    /// Tiles found on disk
    pub skipped: usize,

    /// Stale files removed by pruning
    pub pruned: usize,

    /// Images skipped because they were already complete
    pub complete_images: usize,

    /// Per-image failures (descriptor, pruning, ...)
    pub image_failures: Vec<ImageFailure>,

    /// Per-tile failures
    pub tile_failures: Vec<TileFailure>,

    /// Whether cancellation stopped the run early
    pub cancelled: bool,
}

impl BatchReport {
    pub fn has_failures(&self) -> bool {
        !self.image_failures.is_empty() || !self.tile_failures.is_empty()
    }

    /// Whether the run finished without failures or cancellation.
    pub fn is_success(&self) -> bool {
        !self.has_failures() && !self.cancelled
    }

    pub(crate) fn add_summary(&mut self, summary: FetchSummary) {
        self.fetched += summary.fetched;
        self.skipped += summary.skipped;
        self.tile_failures.extend(summary.failures);
        self.cancelled |= summary.cancelled;
    }
}
