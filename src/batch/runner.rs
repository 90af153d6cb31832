//! Batch runner driving every image of a run.
//!
//! # Flow
//!
//! ```text
//! clean_all() ─► initialize_all() ─► run()
//!  (optional)     per image:          per incomplete image:
//!                 descriptor + plan   prune (optional) + fetch_missing
//! ```
//!
//! A failure in one image is recorded and the batch moves on to the next.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::TargetSpec;
use crate::error::{ConfigError, StorageError};
use crate::io::ImageSource;
use crate::plan::{FetchOptions, ImagePlan};

use super::report::{BatchReport, ImageFailure};

/// Owns the plans of a run and the source they are fetched from.
pub struct BatchRunner<S: ImageSource + 'static> {
    source: Arc<S>,
    plans: Vec<ImagePlan>,
    options: FetchOptions,
    prune: bool,
}

impl<S: ImageSource + 'static> BatchRunner<S> {
    /// Create an empty runner.
    pub fn new(source: Arc<S>, options: FetchOptions) -> Self {
        Self {
            source,
            plans: Vec::new(),
            options,
            prune: false,
        }
    }

    /// Build one plan per target, each with its own copy of the custom crops.
    pub fn from_targets(
        source: Arc<S>,
        options: FetchOptions,
        targets: &[TargetSpec],
        output_root: &Path,
        domain: &str,
        tile_size: u32,
    ) -> Result<Self, ConfigError> {
        let mut runner = Self::new(source, options);
        for target in targets {
            let plan = ImagePlan::new(
                target.identifier.clone(),
                target.normalized_url(),
                output_root,
                domain,
                tile_size,
            )
            .with_custom_crops(target.crops()?);
            runner.add_plan(plan);
        }
        Ok(runner)
    }

    /// Prune unplanned files before fetching each image.
    pub fn with_prune(mut self, prune: bool) -> Self {
        self.prune = prune;
        self
    }

    pub fn add_plan(&mut self, plan: ImagePlan) {
        self.plans.push(plan);
    }

    pub fn plans(&self) -> &[ImagePlan] {
        &self.plans
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    /// Initialize every plan that is not initialized yet.
    ///
    /// Failures are returned per image; the remaining images are still attempted.
    pub async fn initialize_all(&mut self) -> Vec<ImageFailure> {
        let mut failures = Vec::new();

        for plan in self.plans.iter_mut().filter(|p| !p.is_initialized()) {
            if self.options.cancel.is_cancelled() {
                break;
            }

            if let Err(error) = plan
                .initialize_with(self.source.as_ref(), &self.options.limiter)
                .await
            {
                warn!(identifier = %plan.identifier(), error = %error, "Image initialization failed");
                failures.push(ImageFailure {
                    identifier: plan.identifier().to_string(),
                    error,
                });
            }
        }

        failures
    }

    /// Sum of pending tiles over all plans.
    pub fn total_pending(&self) -> usize {
        self.plans.iter().map(ImagePlan::pending_count).sum()
    }

    /// Plans with a missing descriptor or at least one missing tile.
    pub fn incomplete_images(&self) -> Vec<&ImagePlan> {
        self.plans.iter().filter(|p| !p.is_complete()).collect()
    }

    /// Fetch missing tiles of every incomplete image.
    ///
    /// Complete images are skipped without any request. Images whose
    /// initialization failed are skipped; their failure was already reported
    /// by [`initialize_all`](Self::initialize_all).
    pub async fn run(&self) -> BatchReport {
        let mut report = BatchReport {
            complete_images: self.plans.len() - self.incomplete_images().len(),
            ..Default::default()
        };

        info!(
            images = self.plans.len(),
            complete = report.complete_images,
            pending = self.total_pending(),
            "Starting fetch"
        );

        for plan in self.incomplete_images() {
            if self.options.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            if !plan.is_initialized() {
                warn!(identifier = %plan.identifier(), "Image not initialized, skipping");
                continue;
            }

            if self.prune {
                match plan.prune() {
                    Ok(removed) => report.pruned += removed,
                    Err(error) => {
                        warn!(identifier = %plan.identifier(), error = %error, "Prune failed");
                        report.image_failures.push(ImageFailure {
                            identifier: plan.identifier().to_string(),
                            error,
                        });
                    }
                }
            }

            match plan
                .fetch_missing(Arc::clone(&self.source), &self.options)
                .await
            {
                Ok(summary) => report.add_summary(summary),
                Err(error) => report.image_failures.push(ImageFailure {
                    identifier: plan.identifier().to_string(),
                    error,
                }),
            }
        }

        report
    }

    /// Delete every image's output directory.
    pub fn clean_all(&self) -> Result<(), StorageError> {
        for plan in &self.plans {
            info!(identifier = %plan.identifier(), path = %plan.path().display(), "Cleaning");
            plan.clean()?;
        }
        Ok(())
    }
}
