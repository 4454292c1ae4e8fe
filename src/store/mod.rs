//! Tile storage abstraction.
//!
//! Tiles are produced by a [`TileReader`] and persisted by a [`TileWriter`].
//! Backends are bound once at startup and shared by every worker and request
//! handler; each call works on an independent tile address, so
//! implementations must be safe for concurrent use without external locking.
//!
//! # Architecture
//!
//! ```text
//!        ┌──────────────────────┐          ┌──────────────────────┐
//!        │    Export Engine     │          │     Tile Server      │
//!        └─────┬──────────┬─────┘          └──────────┬───────────┘
//!         read │          │ write / delete            │ read
//!              ▼          ▼                           ▼
//! ┌─────────────────┐  ┌──────────────────────────────────────────┐
//! │ PostgisTileReader│  │            RepositoryStore               │
//! │  (slow | fast)  │  │  ┌────────────────┐  ┌────────────────┐  │
//! └─────────────────┘  │  │ FileTileStore  │  │  S3TileStore   │  │
//!                      │  │ {root}/z/x/y   │  │ {prefix}/z/x/y │  │
//!                      │  └────────────────┘  └────────────────┘  │
//!                      └──────────────────────────────────────────┘
//! ```
//!
//! The repository backend is chosen from the destination string by
//! [`Repository::parse`]: an existing directory binds [`FileTileStore`], an
//! `s3://` URI binds [`S3TileStore`], and anything else is rejected before
//! any tile work starts.

mod file;
mod postgis;
mod repository;
mod s3;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StoreError;
use crate::tile::{Envelope, Tile};

pub use file::FileTileStore;
pub use postgis::{connect, layer_sql, PostgisTileReader, ReaderStrategy, DEFAULT_EXTENT_QUERY};
pub use repository::{Repository, RepositoryStore, S3Options};
pub use s3::{create_s3_client, S3TileStore};

/// Produces tile bytes.
#[async_trait]
pub trait TileReader: Send + Sync {
    /// Read the payload of `tile`.
    ///
    /// Returns `Ok(None)` when the tile legitimately has no content.
    async fn read(&self, tile: Tile) -> Result<Option<Bytes>, StoreError>;
}

/// Persists tile bytes.
#[async_trait]
pub trait TileWriter: Send + Sync {
    /// Store `bytes` as the payload of `tile`, replacing any previous payload.
    ///
    /// An empty payload marks a tile with no content: readers of the same
    /// store return `Ok(None)` for it.
    async fn write(&self, tile: Tile, bytes: Bytes) -> Result<(), StoreError>;

    /// Remove the payload of `tile`. Removing an absent tile succeeds.
    async fn delete(&self, tile: Tile) -> Result<(), StoreError>;
}

/// Reports the spatial extent of the underlying data.
#[async_trait]
pub trait DataExtent: Send + Sync {
    /// Bounding box of all data in WGS84, or `None` when there is no data.
    async fn extent(&self) -> Result<Option<Envelope>, StoreError>;
}

#[async_trait]
impl<T: TileReader + ?Sized> TileReader for Arc<T> {
    async fn read(&self, tile: Tile) -> Result<Option<Bytes>, StoreError> {
        (**self).read(tile).await
    }
}

#[async_trait]
impl<T: TileReader + ?Sized> TileReader for Box<T> {
    async fn read(&self, tile: Tile) -> Result<Option<Bytes>, StoreError> {
        (**self).read(tile).await
    }
}

#[async_trait]
impl<T: TileWriter + ?Sized> TileWriter for Arc<T> {
    async fn write(&self, tile: Tile, bytes: Bytes) -> Result<(), StoreError> {
        (**self).write(tile, bytes).await
    }

    async fn delete(&self, tile: Tile) -> Result<(), StoreError> {
        (**self).delete(tile).await
    }
}
