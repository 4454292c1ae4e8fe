//! Test utilities for integration tests.
//!
//! This module provides in-memory stores and readers with request tracking
//! and scripted failures, plus helpers for building configurations.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use mvt_streamer::config::{ConfigFormat, RenderConfig};
use mvt_streamer::error::StoreError;
use mvt_streamer::store::{DataExtent, TileReader, TileWriter};
use mvt_streamer::tile::{Envelope, Tile};

/// Shorthand for a valid tile.
pub fn tile(x: u32, y: u32, z: u8) -> Tile {
    Tile::new(x, y, z).unwrap()
}

/// Deterministic payload of a rendered tile.
pub fn payload(tile: Tile) -> Bytes {
    Bytes::from(format!("mvt:{}", tile))
}

// =============================================================================
// Mock Renderer
// =============================================================================

/// A reader that renders a deterministic payload per tile.
///
/// Reads for tiles in `failing` return a database error; reads for tiles in
/// `empty` return no content.
#[derive(Default)]
pub struct MockRenderer {
    failing: HashSet<Tile>,
    empty: HashSet<Tile>,
    reads: AtomicUsize,
}

impl MockRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, tile: Tile) -> Self {
        self.failing.insert(tile);
        self
    }

    pub fn empty_on(mut self, tile: Tile) -> Self {
        self.empty.insert(tile);
        self
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TileReader for MockRenderer {
    async fn read(&self, tile: Tile) -> Result<Option<Bytes>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&tile) {
            return Err(StoreError::Database(format!(
                "could not render {}: connection refused",
                tile
            )));
        }
        if self.empty.contains(&tile) {
            return Ok(None);
        }
        Ok(Some(payload(tile)))
    }
}

// =============================================================================
// Mock Tile Store
// =============================================================================

/// In-memory tile store tracking every write and delete.
#[derive(Default)]
pub struct MockTileStore {
    tiles: Mutex<HashMap<Tile, Bytes>>,
    failing: HashSet<Tile>,
    empty: HashSet<Tile>,
    writes: Mutex<Vec<Tile>>,
    deletes: AtomicUsize,
}

impl MockTileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a tile.
    pub fn with_tile(self, tile: Tile, bytes: impl Into<Bytes>) -> Self {
        self.tiles.lock().unwrap().insert(tile, bytes.into());
        self
    }

    /// Make reads and writes of `tile` fail.
    pub fn failing_on(mut self, tile: Tile) -> Self {
        self.failing.insert(tile);
        self
    }

    /// Make reads of `tile` return no content.
    pub fn empty_on(mut self, tile: Tile) -> Self {
        self.empty.insert(tile);
        self
    }

    pub fn get(&self, tile: Tile) -> Option<Bytes> {
        self.tiles.lock().unwrap().get(&tile).cloned()
    }

    pub fn len(&self) -> usize {
        self.tiles.lock().unwrap().len()
    }

    /// Snapshot of every stored tile.
    pub fn snapshot(&self) -> HashMap<Tile, Bytes> {
        self.tiles.lock().unwrap().clone()
    }

    /// Tiles passed to `write`, in call order.
    pub fn written(&self) -> Vec<Tile> {
        self.writes.lock().unwrap().clone()
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TileReader for MockTileStore {
    async fn read(&self, tile: Tile) -> Result<Option<Bytes>, StoreError> {
        if self.failing.contains(&tile) {
            return Err(StoreError::S3(format!("internal error reading {}", tile)));
        }
        if self.empty.contains(&tile) {
            return Ok(None);
        }
        // Empty payloads read back as no content, like the real stores
        self.get(tile)
            .map(|bytes| Some(bytes).filter(|b| !b.is_empty()))
            .ok_or_else(|| StoreError::NotFound(tile.path("mvt")))
    }
}

#[async_trait]
impl TileWriter for MockTileStore {
    async fn write(&self, tile: Tile, bytes: Bytes) -> Result<(), StoreError> {
        self.writes.lock().unwrap().push(tile);
        if self.failing.contains(&tile) {
            return Err(StoreError::Io(format!("disk full writing {}", tile)));
        }
        self.tiles.lock().unwrap().insert(tile, bytes);
        Ok(())
    }

    async fn delete(&self, tile: Tile) -> Result<(), StoreError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.tiles.lock().unwrap().remove(&tile);
        Ok(())
    }
}

// =============================================================================
// Mock Data Extent
// =============================================================================

/// Data source reporting a fixed extent.
pub struct StaticExtent(pub Option<Envelope>);

#[async_trait]
impl DataExtent for StaticExtent {
    async fn extent(&self) -> Result<Option<Envelope>, StoreError> {
        Ok(self.0)
    }
}

/// Data source whose extent query fails.
pub struct FailingExtent;

#[async_trait]
impl DataExtent for FailingExtent {
    async fn extent(&self) -> Result<Option<Envelope>, StoreError> {
        Err(StoreError::Database("relation \"osm_nodes\" does not exist".to_string()))
    }
}

// =============================================================================
// Configuration Helpers
// =============================================================================

/// A rendering configuration with a style source and a TileJSON document.
pub fn render_config() -> RenderConfig {
    let text = r#"{
        "id": "osm",
        "tileset": {
            "tilejson": "2.2.0",
            "minzoom": 0,
            "maxzoom": 14,
            "tiles": ["http://example.org/tiles/{z}/{x}/{y}.mvt"]
        },
        "style": {
            "version": 8,
            "sources": {
                "baremaps": { "type": "vector", "url": "http://example.org/tiles.json" }
            },
            "layers": [
                { "id": "roads", "type": "line", "source": "baremaps", "source-layer": "roads" }
            ]
        },
        "layers": [
            { "id": "roads", "queries": [{ "minzoom": 0, "maxzoom": 14, "sql": "SELECT id, tags, geom FROM roads" }] }
        ]
    }"#;
    RenderConfig::parse(text, ConfigFormat::Json, "test.json").unwrap()
}
