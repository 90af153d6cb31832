//! HTTP source tests against an in-process axum server.
//!
//! Tests verify:
//! - A full image is mirrored through real HTTP requests
//! - Any status other than 200 surfaces as `FetchError::Status`

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;

use iiif_level0::error::FetchError;
use iiif_level0::io::{HttpImageSource, ImageSource};
use iiif_level0::plan::{FetchOptions, ImagePlan};

use super::test_utils::TILE_BODY;

const INFO: &str = r#"{"@id": "http://origin/iiif/page", "width": 487, "height": 640}"#;

/// Serves `page` and counts every request.
async fn serve_origin() -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));

    async fn handler(
        State(hits): State<Arc<AtomicUsize>>,
        Path(path): Path<String>,
    ) -> Result<Vec<u8>, StatusCode> {
        hits.fetch_add(1, Ordering::SeqCst);
        match path.as_str() {
            "iiif/page/info.json" => Ok(INFO.as_bytes().to_vec()),
            "iiif/empty/info.json" => Err(StatusCode::NO_CONTENT),
            "iiif/partial/info.json" => Err(StatusCode::PARTIAL_CONTENT),
            p if p.starts_with("iiif/page/") && p.ends_with("/0/default.jpg") => {
                Ok(TILE_BODY.to_vec())
            }
            _ => Err(StatusCode::NOT_FOUND),
        }
    }

    let app = Router::new()
        .route("/{*path}", get(handler))
        .with_state(Arc::clone(&hits));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/iiif"), hits)
}

#[tokio::test]
async fn test_http_source_mirrors_image() {
    let (base, hits) = serve_origin().await;
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(HttpImageSource::new().unwrap());

    let mut plan = ImagePlan::new(
        "page",
        format!("{base}/page"),
        dir.path(),
        "http://localhost",
        256,
    );
    plan.initialize(source.as_ref()).await.unwrap();
    let summary = plan
        .fetch_missing(Arc::clone(&source), &FetchOptions::default())
        .await
        .unwrap();

    assert_eq!(summary.fetched, 12);
    assert!(summary.failures.is_empty());
    assert!(plan.is_complete());
    assert_eq!(hits.load(Ordering::SeqCst), 13);
    assert_eq!(
        std::fs::read(dir.path().join("page/full/full/0/default.jpg")).unwrap(),
        TILE_BODY
    );
}

#[tokio::test]
async fn test_http_source_reports_status() {
    let (base, _) = serve_origin().await;
    let source = HttpImageSource::new().unwrap();
    let url = format!("{base}/unknown/info.json");

    let err = source.fetch(&url).await.unwrap_err();

    match err {
        FetchError::Status { url: failed, status } => {
            assert_eq!(status, 404);
            assert_eq!(failed, url);
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_http_source_rejects_non_200_success() {
    let (base, _) = serve_origin().await;
    let source = HttpImageSource::new().unwrap();

    for (image, expected) in [("empty", 204), ("partial", 206)] {
        let url = format!("{base}/{image}/info.json");
        let err = source.fetch(&url).await.unwrap_err();
        assert!(
            matches!(err, FetchError::Status { status, .. } if status == expected),
            "{image}: {err:?}"
        );
    }
}
