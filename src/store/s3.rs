use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;

use super::{TileReader, TileWriter};
use crate::error::StoreError;
use crate::tile::{Tile, TILE_CONTENT_ENCODING, TILE_CONTENT_TYPE, TILE_EXTENSION};

/// S3-backed tile store.
///
/// Tiles are stored as objects keyed `{prefix}/{z}/{x}/{y}.mvt` in S3 or an
/// S3-compatible service (MinIO, etc.). Objects are written with the vector
/// tile content type and a gzip content encoding so they can be served
/// straight from the bucket.
#[derive(Clone)]
pub struct S3TileStore {
    client: Client,
    bucket: String,
    prefix: String,
}

impl S3TileStore {
    /// Create a store rooted at `prefix` inside `bucket`.
    ///
    /// Leading and trailing slashes of the prefix are ignored.
    pub fn new(client: Client, bucket: impl Into<String>, prefix: impl AsRef<str>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            prefix: prefix.as_ref().trim_matches('/').to_string(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Object key of a tile.
    pub fn key(&self, tile: Tile) -> String {
        tile_key(&self.prefix, tile)
    }
}

fn tile_key(prefix: &str, tile: Tile) -> String {
    let path = tile.path(TILE_EXTENSION);
    if prefix.is_empty() {
        path
    } else {
        format!("{}/{}", prefix, path)
    }
}

#[async_trait]
impl TileReader for S3TileStore {
    async fn read(&self, tile: Tile) -> Result<Option<Bytes>, StoreError> {
        let key = self.key(tile);
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| {
                let no_such_key = e
                    .as_service_error()
                    .map(|se| se.is_no_such_key())
                    .unwrap_or(false);
                let status_is_404 = e
                    .raw_response()
                    .map(|r| r.status().as_u16() == 404)
                    .unwrap_or(false);

                if no_such_key || status_is_404 {
                    StoreError::NotFound(format!("s3://{}/{}", self.bucket, key))
                } else {
                    StoreError::S3(DisplayErrorContext(&e).to_string())
                }
            })?;

        let data = resp
            .body
            .collect()
            .await
            .map_err(|e| StoreError::S3(e.to_string()))?
            .into_bytes();

        if data.is_empty() {
            Ok(None)
        } else {
            Ok(Some(data))
        }
    }
}

#[async_trait]
impl TileWriter for S3TileStore {
    async fn write(&self, tile: Tile, bytes: Bytes) -> Result<(), StoreError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(self.key(tile))
            .content_type(TILE_CONTENT_TYPE)
            .content_encoding(TILE_CONTENT_ENCODING)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StoreError::S3(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }

    async fn delete(&self, tile: Tile) -> Result<(), StoreError> {
        // S3 reports success for keys that do not exist
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(self.key(tile))
            .send()
            .await
            .map_err(|e| StoreError::S3(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }
}

/// Create an S3 client with optional custom endpoint and region.
///
/// Use a custom endpoint for S3-compatible services like MinIO:
/// ```ignore
/// let client = create_s3_client(Some("http://localhost:9000"), "us-east-1").await;
/// ```
pub async fn create_s3_client(endpoint_url: Option<&str>, region: &str) -> Client {
    let region = aws_config::Region::new(region.to_string());
    let mut config_loader =
        aws_config::defaults(aws_config::BehaviorVersion::latest()).region(region);

    if let Some(endpoint) = endpoint_url {
        config_loader = config_loader.endpoint_url(endpoint);
    }

    let sdk_config = config_loader.load().await;

    // S3-compatible services generally need path-style addressing
    let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
        .force_path_style(endpoint_url.is_some())
        .build();

    Client::from_conf(s3_config)
}
