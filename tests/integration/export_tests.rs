//! Export engine integration tests.
//!
//! Tests verify:
//! - Failure isolation: a failing tile never stops the others
//! - Idempotence: re-running a work set produces identical stored bytes
//! - Empty tiles overwrite stale output and are served as no content
//! - Full export from a work set into a filesystem repository

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use bytes::Bytes;
use tower::ServiceExt;

use mvt_streamer::error::ExportError;
use mvt_streamer::export::{build_work_set, parse_delta, ExportEngine, WorkSet};
use mvt_streamer::store::{FileTileStore, TileReader};
use mvt_streamer::tile::Tile;
use mvt_streamer::{create_router, RouterConfig};

use super::test_utils::{payload, render_config, tile, MockRenderer, MockTileStore, StaticExtent};

fn five_tiles() -> Vec<Tile> {
    vec![
        tile(0, 0, 2),
        tile(1, 0, 2),
        tile(2, 0, 2),
        tile(3, 0, 2),
        tile(0, 1, 2),
    ]
}

// =============================================================================
// Failure Isolation
// =============================================================================

#[tokio::test]
async fn test_read_failure_does_not_abort_run() {
    let work = five_tiles();
    let broken = work[3];
    let reader = Arc::new(MockRenderer::new().failing_on(broken));
    let writer = Arc::new(MockTileStore::new());

    let report = ExportEngine::new(4)
        .run(work.clone().into_iter(), reader.clone(), writer.clone())
        .await;

    assert_eq!(report.attempted, 5);
    assert_eq!(report.written, 4);
    assert_eq!(reader.read_count(), 5);

    // The writer received every other tile
    let mut written = writer.written();
    written.sort();
    let mut expected: Vec<Tile> = work.iter().copied().filter(|t| *t != broken).collect();
    expected.sort();
    assert_eq!(written, expected);

    assert_eq!(report.failed, 1);
    match &report.errors[0] {
        ExportError::Read { tile, source } => {
            assert_eq!(*tile, broken);
            assert!(source.to_string().contains("connection refused"));
        }
        other => panic!("unexpected failure: {:?}", other),
    }
}

#[tokio::test]
async fn test_write_failure_does_not_abort_run() {
    let work = five_tiles();
    let reader = Arc::new(MockRenderer::new());
    let writer = Arc::new(MockTileStore::new().failing_on(work[0]));

    let report = ExportEngine::new(2)
        .run(work.clone().into_iter(), reader, writer.clone())
        .await;

    assert_eq!(report.attempted, 5);
    assert_eq!(report.written, 4);
    assert_eq!(writer.len(), 4);
    assert!(matches!(
        &report.errors[0],
        ExportError::Write { tile, .. } if *tile == work[0]
    ));
}

#[tokio::test]
async fn test_failed_tiles_can_be_rerun_as_delta() {
    let work = five_tiles();
    let reader = Arc::new(MockRenderer::new().failing_on(work[1]).failing_on(work[4]));
    let writer = Arc::new(MockTileStore::new());

    let report = ExportEngine::new(3)
        .run(work.clone().into_iter(), reader, writer.clone())
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("failed.txt");
    report.write_failures(&path).await.unwrap();

    let retry = parse_delta(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(retry, vec![work[1], work[4]]);

    // Second run over the failed tiles only, with a healthy reader
    let report = ExportEngine::new(3)
        .run(
            WorkSet::delta(&retry, 2, 2),
            Arc::new(MockRenderer::new()),
            writer.clone(),
        )
        .await;
    assert!(report.is_success());
    assert_eq!(writer.len(), 5);
}

// =============================================================================
// Idempotence
// =============================================================================

#[tokio::test]
async fn test_rerun_produces_identical_output() {
    let work: Vec<Tile> = WorkSet::full(Some(tile(1, 1, 2).envelope()), 2, 5).collect();
    let writer = Arc::new(MockTileStore::new());

    let first = ExportEngine::new(4)
        .run(work.clone().into_iter(), Arc::new(MockRenderer::new()), writer.clone())
        .await;
    let after_first = writer.snapshot();

    let second = ExportEngine::new(2)
        .run(work.clone().into_iter(), Arc::new(MockRenderer::new()), writer.clone())
        .await;
    let after_second = writer.snapshot();

    assert_eq!(first.written, work.len() as u64);
    assert_eq!(second.written, work.len() as u64);
    assert_eq!(after_first, after_second);
    assert_eq!(after_first.len(), work.len());
    for t in &work {
        assert_eq!(after_second.get(t), Some(&payload(*t)));
    }
}

#[tokio::test]
async fn test_empty_tile_overwrites_stale_output() {
    let stale = tile(2, 1, 2);
    let reader = Arc::new(MockRenderer::new().empty_on(stale));
    let writer = Arc::new(MockTileStore::new().with_tile(stale, Bytes::from_static(b"old")));

    let report = ExportEngine::new(2)
        .run(vec![stale, tile(0, 0, 2)].into_iter(), reader, writer.clone())
        .await;

    assert!(report.is_success());
    assert_eq!(report.empty, 1);
    assert_eq!(writer.delete_count(), 0);
    assert_eq!(writer.get(stale), Some(Bytes::new()));
    assert_eq!(writer.read(stale).await.unwrap(), None);
    assert!(writer.get(tile(0, 0, 2)).is_some());
}

#[tokio::test]
async fn test_exported_empty_tile_is_served_as_no_content() {
    let dir = tempfile::tempdir().unwrap();
    let writer = Arc::new(FileTileStore::new(dir.path()));
    let ocean = tile(1, 2, 3);
    let land = tile(0, 0, 3);
    let reader = Arc::new(MockRenderer::new().empty_on(ocean));

    let report = ExportEngine::new(2)
        .run(vec![ocean, land].into_iter(), reader, writer.clone())
        .await;
    assert!(report.is_success());
    assert_eq!(report.empty, 1);

    let app = create_router(
        writer,
        Arc::new(render_config()),
        RouterConfig::new("localhost:9000").with_tracing(false),
    );

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/tiles/3/1/2.mvt").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(Request::builder().uri("/tiles/3/0/0.mvt").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// End to End
// =============================================================================

#[tokio::test]
async fn test_full_export_to_filesystem() {
    let dir = tempfile::tempdir().unwrap();
    let writer = Arc::new(FileTileStore::new(dir.path()));
    let reader = Arc::new(MockRenderer::new());
    let extent = StaticExtent(Some(tile(0, 0, 1).envelope()));

    let work_set = build_work_set(&extent, None, 0, 2).await.unwrap();
    assert_eq!(work_set.tile_count(), 1 + 1 + 4);

    let report = ExportEngine::new(2).run(work_set, reader, writer.clone()).await;

    assert!(report.is_success());
    assert_eq!(report.written, 6);
    for t in [tile(0, 0, 0), tile(0, 0, 1), tile(1, 1, 2)] {
        let path = dir.path().join(t.path("mvt"));
        assert!(path.is_file(), "missing {}", path.display());
        assert_eq!(writer.read(t).await.unwrap(), Some(payload(t)));
    }
    assert!(!dir.path().join("1/1/0.mvt").exists());
}

#[tokio::test]
async fn test_inverted_zoom_range_exports_nothing() {
    let extent = StaticExtent(Some(tile(0, 0, 0).envelope()));
    let work_set = build_work_set(&extent, None, 5, 3).await.unwrap();

    let writer = Arc::new(MockTileStore::new());
    let report = ExportEngine::new(2)
        .run(work_set, Arc::new(MockRenderer::new()), writer.clone())
        .await;

    assert_eq!(report.attempted, 0);
    assert_eq!(writer.len(), 0);
}
