//! Batch execution over all configured images.
//!
//! - [`BatchRunner`]: initializes plans, aggregates pending counts and fetches
//!   only for incomplete images
//! - [`BatchReport`]: totals plus per-image and per-tile failures

mod report;
mod runner;

pub use report::{BatchReport, ImageFailure};
pub use runner::BatchRunner;
