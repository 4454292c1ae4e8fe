//! Tile store integration tests.
//!
//! Tests verify:
//! - Repository selection from its identifier
//! - Filesystem layout shared with the object store keys
//! - Concurrent writers on one filesystem repository

use std::sync::Arc;

use bytes::Bytes;

use mvt_streamer::error::{RepositoryError, StoreError};
use mvt_streamer::store::{
    create_s3_client, Repository, RepositoryStore, S3Options, S3TileStore, TileReader, TileWriter,
};
use mvt_streamer::tile::enumerate;

use super::test_utils::tile;

#[tokio::test]
async fn test_directory_selects_filesystem_store() {
    let dir = tempfile::tempdir().unwrap();
    let repository = Repository::parse(dir.path().to_str().unwrap()).unwrap();
    let store = repository.open(&S3Options::default()).await;
    assert!(matches!(store, RepositoryStore::File(_)));
}

#[tokio::test]
async fn test_s3_uri_selects_object_store() {
    let repository = Repository::parse("s3://tiles/planet").unwrap();
    let options = S3Options {
        endpoint: Some("http://localhost:9000".to_string()),
        region: "us-east-1".to_string(),
    };
    match repository.open(&options).await {
        RepositoryStore::S3(store) => {
            assert_eq!(store.bucket(), "tiles");
            assert_eq!(store.key(tile(3, 5, 4)), "planet/4/3/5.mvt");
        }
        RepositoryStore::File(_) => panic!("expected an S3 store"),
    }
}

#[test]
fn test_unknown_repository_is_rejected() {
    assert!(matches!(
        Repository::parse("ftp://example.com/tiles"),
        Err(RepositoryError::Unsupported(_))
    ));
    assert!(matches!(
        Repository::parse("relative/missing/dir"),
        Err(RepositoryError::Unsupported(_))
    ));
}

#[tokio::test]
async fn test_filesystem_and_object_store_share_layout() {
    let dir = tempfile::tempdir().unwrap();
    let repository = Repository::parse(dir.path().to_str().unwrap()).unwrap();
    let store = repository.open(&S3Options::default()).await;
    let client = create_s3_client(Some("http://localhost:9000"), "us-east-1").await;
    let s3 = S3TileStore::new(client, "bucket", "");

    let t = tile(19295, 24640, 16);
    store.write(t, Bytes::from_static(b"nyc")).await.unwrap();

    let relative = s3.key(t);
    assert_eq!(relative, "16/19295/24640.mvt");
    assert!(dir.path().join(&relative).is_file());
}

#[tokio::test]
async fn test_concurrent_writes() {
    let dir = tempfile::tempdir().unwrap();
    let repository = Repository::parse(dir.path().to_str().unwrap()).unwrap();
    let store = Arc::new(repository.open(&S3Options::default()).await);

    let tiles: Vec<_> = enumerate(tile(0, 0, 0).envelope(), 0, 4).collect();
    let mut handles = Vec::new();
    for t in tiles.clone() {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.write(t, Bytes::from(t.to_string())).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    for t in tiles {
        let bytes = store.read(t).await.unwrap().unwrap();
        assert_eq!(bytes, Bytes::from(t.to_string()));
    }
}

#[tokio::test]
async fn test_missing_tile_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let repository = Repository::parse(dir.path().to_str().unwrap()).unwrap();
    let store = repository.open(&S3Options::default()).await;

    assert!(matches!(
        store.read(tile(1, 1, 1)).await,
        Err(StoreError::NotFound(_))
    ));
    // Deleting an absent tile succeeds
    store.delete(tile(1, 1, 1)).await.unwrap();
}
