//! API integration tests for tile serving and metadata documents.
//!
//! Tests verify:
//! - Tile retrieval status codes (200, 204, 404) and headers
//! - Invalid tile paths
//! - Style and TileJSON rewriting from the request's Host header
//! - Serving a filesystem repository end to end

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use http_body_util::BodyExt;
use tower::ServiceExt;

use mvt_streamer::store::{Repository, S3Options, TileWriter};
use mvt_streamer::{create_router, RouterConfig};

use super::test_utils::{render_config, tile, MockTileStore};

fn router(store: MockTileStore) -> Router {
    create_router(
        Arc::new(store),
        Arc::new(render_config()),
        RouterConfig::new("fallback:9000").with_tracing(false),
    )
}

async fn get(router: Router, uri: &str, host: Option<&str>) -> axum::response::Response {
    let mut builder = Request::builder().uri(uri);
    if let Some(host) = host {
        builder = builder.header("host", host);
    }
    router
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

// =============================================================================
// Tile Retrieval
// =============================================================================

#[tokio::test]
async fn test_tile_retrieval_success() {
    let store = MockTileStore::new().with_tile(tile(1, 2, 3), Bytes::from_static(b"tile-bytes"));

    let response = get(router(store), "/tiles/3/1/2.mvt", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(
        headers.get("content-type").unwrap(),
        "application/vnd.mapbox-vector-tile"
    );
    assert_eq!(headers.get("content-encoding").unwrap(), "gzip");
    assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"tile-bytes");
}

#[tokio::test]
async fn test_empty_tile_returns_no_content() {
    let store = MockTileStore::new().empty_on(tile(0, 0, 0));

    let response = get(router(store), "/tiles/0/0/0.mvt", None).await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_store_error_returns_not_found() {
    let store = MockTileStore::new().failing_on(tile(5, 5, 4));

    let response = get(router(store), "/tiles/4/5/5.mvt", None).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    // The error message stays server-side
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_missing_tile_returns_not_found() {
    let response = get(router(MockTileStore::new()), "/tiles/2/1/1.mvt", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_tile_paths() {
    let store = Arc::new(MockTileStore::new().with_tile(tile(0, 0, 0), Bytes::from_static(b"x")));
    let app = create_router(
        store,
        Arc::new(render_config()),
        RouterConfig::new("fallback:9000").with_tracing(false),
    );

    for uri in [
        "/tiles/0/0/0",
        "/tiles/0/0/0.png",
        "/tiles/a/0/0.mvt",
        "/tiles/0/x/0.mvt",
        "/tiles/3/8/0.mvt",
        "/tiles/3/0/8.mvt",
        "/tiles/31/0/0.mvt",
        "/tiles/0/0.mvt",
    ] {
        let response = get(app.clone(), uri, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "uri: {}", uri);
    }
}

// =============================================================================
// Metadata Documents
// =============================================================================

#[tokio::test]
async fn test_style_rewritten_to_request_host() {
    let response = get(
        router(MockTileStore::new()),
        "/style.json",
        Some("maps.example.com:8080"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let style: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        style["sources"]["baremaps"]["url"],
        "http://maps.example.com:8080/tiles.json"
    );
    assert_eq!(style["layers"][0]["id"], "roads");
}

#[tokio::test]
async fn test_tileset_rewritten_to_request_host() {
    let response = get(
        router(MockTileStore::new()),
        "/tiles.json",
        Some("localhost:9000"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let tileset: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        tileset["tiles"],
        serde_json::json!(["http://localhost:9000/tiles/{z}/{x}/{y}.mvt"])
    );
    assert_eq!(tileset["maxzoom"], 14);
}

#[tokio::test]
async fn test_tileset_without_host_uses_fallback() {
    let response = get(router(MockTileStore::new()), "/tiles.json", None).await;

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let tileset: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        tileset["tiles"][0],
        "http://fallback:9000/tiles/{z}/{x}/{y}.mvt"
    );
}

#[tokio::test]
async fn test_metadata_cors_preflight() {
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/style.json")
        .header("origin", "https://viewer.example.com")
        .header("access-control-request-method", "GET")
        .body(Body::empty())
        .unwrap();

    let response = router(MockTileStore::new()).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
}

// =============================================================================
// Health Endpoint
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let response = get(router(MockTileStore::new()), "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let health: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "healthy");
    assert!(health["version"].is_string());
}

// =============================================================================
// Filesystem Repository
// =============================================================================

#[tokio::test]
async fn test_serve_filesystem_repository() {
    let dir = tempfile::tempdir().unwrap();
    let repository = Repository::parse(dir.path().to_str().unwrap()).unwrap();
    let store = repository.open(&S3Options::default()).await;
    store
        .write(tile(3, 4, 5), Bytes::from_static(b"stored"))
        .await
        .unwrap();

    let app = create_router(
        Arc::new(store),
        Arc::new(render_config()),
        RouterConfig::new("localhost:9000").with_tracing(false),
    );

    let response = get(app.clone(), "/tiles/5/3/4.mvt", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"stored");

    let response = get(app, "/tiles/5/4/4.mvt", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
