//! Batch runner integration tests.
//!
//! Tests verify:
//! - One failing image does not stop the others
//! - Complete images are skipped without requests
//! - Tile failures are reported and the remaining tiles still land
//! - Cleaning, pruning and cancellation across the batch

use std::sync::Arc;

use iiif_level0::config::{parse_targets, TargetSpec};
use iiif_level0::error::{FetchError, PlanError};
use iiif_level0::plan::{FetchOptions, ImagePlan};
use iiif_level0::BatchRunner;

use super::test_utils::{count_jpgs, image_url, MockImageSource, ORIGIN};

const DOMAIN: &str = "http://localhost:8080";

fn runner_with(
    source: MockImageSource,
    root: &std::path::Path,
    identifiers: &[&str],
) -> BatchRunner<MockImageSource> {
    let mut runner = BatchRunner::new(Arc::new(source), FetchOptions::default());
    for id in identifiers {
        runner.add_plan(ImagePlan::new(*id, image_url(id), root, DOMAIN, 256));
    }
    runner
}

// =============================================================================
// Initialization
// =============================================================================

#[tokio::test]
async fn test_failed_image_does_not_stop_batch() {
    let dir = tempfile::tempdir().unwrap();
    let source = MockImageSource::new()
        .with_image("a", 487, 640)
        .with_image("c", 300, 300);
    let mut runner = runner_with(source, dir.path(), &["a", "missing", "c"]);

    let failures = runner.initialize_all().await;

    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].identifier, "missing");
    assert!(matches!(
        failures[0].error,
        PlanError::Fetch(FetchError::Status { status: 404, .. })
    ));

    let initialized: Vec<bool> = runner.plans().iter().map(ImagePlan::is_initialized).collect();
    assert_eq!(initialized, vec![true, false, true]);

    // 12 for "a"; "c" is 300x300: full + 16..256 + 4 tiles at sf 1
    assert_eq!(runner.total_pending(), 12 + 10);

    let report = runner.run().await;
    assert_eq!(report.fetched, 22);
    assert!(report.image_failures.is_empty());
    assert!(report.tile_failures.is_empty());
    assert!(!dir.path().join("missing").exists());
}

#[tokio::test]
async fn test_initialize_all_skips_initialized_plans() {
    let dir = tempfile::tempdir().unwrap();
    let source = MockImageSource::new().with_image("a", 487, 640);
    let mut runner = runner_with(source.clone(), dir.path(), &["a"]);

    assert!(runner.initialize_all().await.is_empty());
    assert!(runner.initialize_all().await.is_empty());
    assert_eq!(source.request_count(), 1);
}

// =============================================================================
// Run
// =============================================================================

#[tokio::test]
async fn test_run_skips_complete_images() {
    let dir = tempfile::tempdir().unwrap();
    let source = MockImageSource::new()
        .with_image("a", 487, 640)
        .with_image("b", 487, 640);
    let mut runner = runner_with(source.clone(), dir.path(), &["a", "b"]);
    runner.initialize_all().await;

    // Finish "a" up front
    runner.plans()[0]
        .fetch_missing(Arc::new(source.clone()), &FetchOptions::default())
        .await
        .unwrap();

    let incomplete: Vec<&str> = runner
        .incomplete_images()
        .iter()
        .map(|p| p.identifier())
        .collect();
    assert_eq!(incomplete, vec!["b"]);

    source.reset_tracking();
    let report = runner.run().await;

    assert_eq!(report.complete_images, 1);
    assert_eq!(report.fetched, 12);
    assert_eq!(report.skipped, 0);
    assert!(source
        .requests()
        .iter()
        .all(|url| url.starts_with(&image_url("b"))));
    assert!(runner.incomplete_images().is_empty());
    assert_eq!(runner.total_pending(), 0);
}

#[tokio::test]
async fn test_tile_failure_is_reported_and_others_land() {
    let dir = tempfile::tempdir().unwrap();
    let broken = format!("{}/full/64,/0/default.jpg", image_url("a"));
    let source = MockImageSource::new()
        .with_image("a", 487, 640)
        .with_failing_url(broken.clone());
    let mut runner = runner_with(source, dir.path(), &["a"]);
    runner.initialize_all().await;

    let report = runner.run().await;

    assert_eq!(report.fetched, 11);
    assert_eq!(report.tile_failures.len(), 1);
    assert_eq!(report.tile_failures[0].url, broken);
    assert_eq!(report.tile_failures[0].crop.to_string(), "full/64,");
    assert!(report.has_failures());
    assert_eq!(runner.total_pending(), 1);
    assert_eq!(count_jpgs(dir.path()), 11);
}

#[tokio::test]
async fn test_run_with_prune() {
    let dir = tempfile::tempdir().unwrap();
    let source = MockImageSource::new().with_image("a", 487, 640);

    let stale = dir.path().join("a/1,1,10,10/5,/0/default.jpg");
    std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
    std::fs::write(&stale, b"old").unwrap();

    let mut runner = runner_with(source, dir.path(), &["a"]).with_prune(true);
    runner.initialize_all().await;
    let report = runner.run().await;

    assert_eq!(report.pruned, 1);
    assert!(!stale.exists());
    assert_eq!(count_jpgs(dir.path()), 12);
}

#[tokio::test]
async fn test_cancelled_run_makes_no_tile_requests() {
    let dir = tempfile::tempdir().unwrap();
    let source = MockImageSource::new().with_image("a", 487, 640);
    let mut runner = runner_with(source.clone(), dir.path(), &["a"]);
    runner.initialize_all().await;

    runner.options().cancel.cancel();
    source.reset_tracking();
    let report = runner.run().await;

    assert!(report.cancelled);
    assert!(!report.is_success());
    assert_eq!(source.request_count(), 0);
    assert_eq!(runner.total_pending(), 12);
}

#[tokio::test]
async fn test_run_skips_uninitialized_plans() {
    let dir = tempfile::tempdir().unwrap();
    let source = MockImageSource::new().with_image("a", 487, 640);
    let runner = runner_with(source.clone(), dir.path(), &["a"]);

    let report = runner.run().await;

    assert_eq!(report.fetched, 0);
    assert!(report.image_failures.is_empty());
    assert_eq!(source.request_count(), 0);
}

// =============================================================================
// Clean and Targets
// =============================================================================

#[tokio::test]
async fn test_clean_all_removes_image_directories() {
    let dir = tempfile::tempdir().unwrap();
    let source = MockImageSource::new()
        .with_image("a", 487, 640)
        .with_image("b", 300, 300);
    let mut runner = runner_with(source, dir.path(), &["a", "b"]);
    runner.initialize_all().await;
    runner.run().await;
    assert!(dir.path().join("a").is_dir());

    runner.clean_all().unwrap();

    assert!(!dir.path().join("a").exists());
    assert!(!dir.path().join("b").exists());
    assert!(dir.path().is_dir());
}

#[tokio::test]
async fn test_from_targets_builds_plans_with_custom_crops() {
    let dir = tempfile::tempdir().unwrap();
    let body = format!(
        r#"[
            {{"url": "{ORIGIN}/a/", "identifier": "a"}},
            {{"url": "{ORIGIN}/b", "identifier": "b",
              "custom_tiles": [{{"region_x": 0, "region_y": 0, "region_w": 100, "region_h": 50, "size_w": 10}}]}}
        ]"#
    );
    let targets: Vec<TargetSpec> = parse_targets(std::path::Path::new("targets.json"), body.as_bytes()).unwrap();

    let source = MockImageSource::new()
        .with_image("a", 487, 640)
        .with_image("b", 487, 640);
    let mut runner = BatchRunner::from_targets(
        Arc::new(source),
        FetchOptions::default(),
        &targets,
        dir.path(),
        DOMAIN,
        256,
    )
    .unwrap();

    assert_eq!(runner.plans().len(), 2);
    assert_eq!(runner.plans()[0].source_url(), image_url("a"));
    assert!(runner.plans()[0].custom_crops().is_empty());
    assert_eq!(runner.plans()[1].custom_crops().len(), 1);

    assert!(runner.initialize_all().await.is_empty());
    assert_eq!(runner.total_pending(), 12 + 13);

    let report = runner.run().await;
    assert!(report.is_success());
    assert!(dir
        .path()
        .join("b/0,0,100,50/10,/0/default.jpg")
        .is_file());
}
