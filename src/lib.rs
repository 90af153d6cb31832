//! # IIIF Level 0
//!
//! Mirror images from a dynamic IIIF Image API 2.x server into a static,
//! Level-0 compliant tile set on the local filesystem.
//!
//! For every source image the crate downloads the `info.json` descriptor once,
//! rewrites it as a Level-0 descriptor, and fetches a deterministic set of
//! crops (full image, fixed-width downsizes, a multi-resolution tile pyramid,
//! and optional custom crops). Files already on disk are never fetched again,
//! so an interrupted run resumes where it stopped.
//!
//! ## Features
//!
//! - **Deterministic planning**: the same image and tile size always yield the same crops in the same order
//! - **Resumable**: completion is derived from the filesystem, not from memory
//! - **Polite**: bounded concurrency and a shared inter-request delay
//! - **Atomic writes**: partial downloads never appear as finished files
//!
//! ## Architecture
//!
//! - [`geometry`] - Crop specifications and the tile planner
//! - [`descriptor`] - Source and Level-0 `info.json` documents
//! - [`io`] - Origin access, rate limiting and atomic file writes
//! - [`plan`] - Per-image plans and tile records
//! - [`batch`] - Runner over every configured image
//! - [`config`] - CLI options and the targets file
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use iiif_level0::{BatchRunner, FetchOptions, HttpImageSource, ImagePlan};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = Arc::new(HttpImageSource::new()?);
//!     let mut runner = BatchRunner::new(source, FetchOptions::default());
//!     runner.add_plan(ImagePlan::new(
//!         "page-1",
//!         "https://iiif.example.org/iiif/2/page-1",
//!         "/srv/iiif",
//!         "https://static.example.org/iiif",
//!         512,
//!     ));
//!
//!     runner.initialize_all().await;
//!     let report = runner.run().await;
//!     println!("fetched {} tiles", report.fetched);
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod geometry;
pub mod io;
pub mod plan;

// Re-export commonly used types
pub use batch::{BatchReport, BatchRunner, ImageFailure};
pub use config::{load_targets, Config, CropSpecInput, TargetSpec};
pub use descriptor::{translate_info, Level0Info, SourceInfo};
pub use error::{ConfigError, FetchError, PlanError, StorageError};
pub use geometry::{CropSpec, Region, Size};
pub use io::{HttpImageSource, ImageSource, RateLimiter};
pub use plan::{FetchOptions, FetchSummary, ImagePlan, TileFailure, TileRecord};
