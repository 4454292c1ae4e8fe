//! Filesystem-backed tile store.
//!
//! Tiles live at `{root}/{z}/{x}/{y}.mvt`. Writes go to a temporary sibling
//! file that is renamed into place, so readers never observe a partial tile.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;

use super::{TileReader, TileWriter};
use crate::error::StoreError;
use crate::tile::{Tile, TILE_EXTENSION};

/// Suffix counter for temporary files, unique within the process.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct FileTileStore {
    root: PathBuf,
}

impl FileTileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the repository.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of a tile's file.
    pub fn path(&self, tile: Tile) -> PathBuf {
        self.root.join(tile.path(TILE_EXTENSION))
    }
}

fn io_err(path: &Path, err: std::io::Error) -> StoreError {
    StoreError::Io(format!("{}: {}", path.display(), err))
}

#[async_trait]
impl TileReader for FileTileStore {
    async fn read(&self, tile: Tile) -> Result<Option<Bytes>, StoreError> {
        let path = self.path(tile);
        match fs::read(&path).await {
            Ok(data) if data.is_empty() => Ok(None),
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound(path.display().to_string()))
            }
            Err(e) => Err(io_err(&path, e)),
        }
    }
}

#[async_trait]
impl TileWriter for FileTileStore {
    async fn write(&self, tile: Tile, bytes: Bytes) -> Result<(), StoreError> {
        let path = self.path(tile);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| io_err(parent, e))?;
        }

        let temp = path.with_extension(format!(
            "{}.{}-{}.tmp",
            TILE_EXTENSION,
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        if let Err(e) = fs::write(&temp, &bytes).await {
            let _ = fs::remove_file(&temp).await;
            return Err(io_err(&temp, e));
        }
        if let Err(e) = fs::rename(&temp, &path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(io_err(&path, e));
        }
        Ok(())
    }

    async fn delete(&self, tile: Tile) -> Result<(), StoreError> {
        let path = self.path(tile);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(&path, e)),
        }
    }
}
