//! Per-image planning and materialization.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │               ImagePlan                 │
//! │  (descriptor + ordered TileRecords)     │
//! └────────────────────┬────────────────────┘
//!                      │ geometry::planner
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │              TileRecord                 │
//! │  (crop ⇄ origin URL ⇄ local file)       │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │         ImageSource (io module)         │
//! └─────────────────────────────────────────┘
//! ```

mod image;
mod tile;

pub use image::{
    FetchOptions, FetchSummary, ImagePlan, TileFailure, DEFAULT_CONCURRENCY, INFO_FILE,
};
pub use tile::{Materialized, TileRecord};
