use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::info;
use url::Url;

use super::{create_s3_client, FileTileStore, S3TileStore, TileReader, TileWriter};
use crate::error::{RepositoryError, StoreError};
use crate::tile::Tile;

/// A tile repository location, resolved from its textual identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Repository {
    /// Local directory holding `{z}/{x}/{y}.mvt` files.
    File(PathBuf),

    /// Object store location `s3://{bucket}/{prefix}`.
    S3 { bucket: String, prefix: String },
}

/// Connection settings for S3 repositories.
#[derive(Debug, Clone, Default)]
pub struct S3Options {
    pub endpoint: Option<String>,
    pub region: String,
}

impl Repository {
    /// Resolve a repository identifier.
    ///
    /// `s3://bucket[/prefix]` selects the object store; a path naming an
    /// existing directory selects the filesystem. Anything else fails.
    pub fn parse(identifier: &str) -> Result<Self, RepositoryError> {
        if identifier.starts_with("s3://") {
            return parse_s3_uri(identifier);
        }

        let path = Path::new(identifier);
        if !identifier.is_empty() && path.is_dir() {
            return Ok(Repository::File(path.to_path_buf()));
        }

        Err(RepositoryError::Unsupported(identifier.to_string()))
    }

    /// Bind the repository to a concrete store.
    pub async fn open(&self, s3: &S3Options) -> RepositoryStore {
        match self {
            Repository::File(root) => {
                info!(root = %root.display(), "Using filesystem tile repository");
                RepositoryStore::File(FileTileStore::new(root.clone()))
            }
            Repository::S3 { bucket, prefix } => {
                info!(
                    bucket = %bucket,
                    prefix = %prefix,
                    endpoint = ?s3.endpoint,
                    region = %s3.region,
                    "Using S3 tile repository"
                );
                let client = create_s3_client(s3.endpoint.as_deref(), &s3.region).await;
                RepositoryStore::S3(S3TileStore::new(client, bucket.clone(), prefix))
            }
        }
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Repository::File(root) => write!(f, "{}", root.display()),
            Repository::S3 { bucket, prefix } if prefix.is_empty() => write!(f, "s3://{}", bucket),
            Repository::S3 { bucket, prefix } => write!(f, "s3://{}/{}", bucket, prefix),
        }
    }
}

fn parse_s3_uri(uri: &str) -> Result<Repository, RepositoryError> {
    let invalid = |reason: &str| RepositoryError::InvalidS3Uri {
        uri: uri.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(uri).map_err(|e| invalid(&e.to_string()))?;
    let bucket = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| invalid("missing bucket name"))?;
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("query strings and fragments are not supported"));
    }

    Ok(Repository::S3 {
        bucket: bucket.to_string(),
        prefix: url.path().trim_matches('/').to_string(),
    })
}

/// A repository bound to its backend.
#[derive(Clone)]
pub enum RepositoryStore {
    File(FileTileStore),
    S3(S3TileStore),
}

#[async_trait]
impl TileReader for RepositoryStore {
    async fn read(&self, tile: Tile) -> Result<Option<Bytes>, StoreError> {
        match self {
            RepositoryStore::File(store) => store.read(tile).await,
            RepositoryStore::S3(store) => store.read(tile).await,
        }
    }
}

#[async_trait]
impl TileWriter for RepositoryStore {
    async fn write(&self, tile: Tile, bytes: Bytes) -> Result<(), StoreError> {
        match self {
            RepositoryStore::File(store) => store.write(tile, bytes).await,
            RepositoryStore::S3(store) => store.write(tile, bytes).await,
        }
    }

    async fn delete(&self, tile: Tile) -> Result<(), StoreError> {
        match self {
            RepositoryStore::File(store) => store.delete(tile).await,
            RepositoryStore::S3(store) => store.delete(tile).await,
        }
    }
}
