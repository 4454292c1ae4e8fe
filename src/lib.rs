//! # MVT Streamer
//!
//! Export and serve Mapbox Vector Tiles rendered from a PostGIS database.
//!
//! The export pipeline decides which tiles must be (re)generated, renders them
//! with a bounded pool of workers and stores them in a repository on the local
//! filesystem or in S3-compatible object storage. A failing tile is logged and
//! reported without stopping the run. The server publishes the stored tiles
//! (or renders them on the fly) together with the style and TileJSON documents
//! map clients need.
//!
//! ## Features
//!
//! - **Full and delta exports**: every tile covering the data extent, or only
//!   the tiles affected by a list of changed tiles, across a zoom range
//! - **Pluggable repositories**: a directory or `s3://bucket/prefix`, with the
//!   same `{z}/{x}/{y}.mvt` layout
//! - **Two rendering strategies**: one statement per layer, or one statement
//!   per tile
//! - **Host-aware metadata**: style and TileJSON URLs follow the address the
//!   client used
//!
//! ## Architecture
//!
//! - [`tile`] - Tile addressing and enumeration
//! - [`store`] - Tile readers and writers (filesystem, S3, PostGIS)
//! - [`export`] - Work sets and the export engine
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and rendering configuration
//! - [`fetch`] - Loading resources from paths or URLs
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mvt_streamer::{build_work_set, ExportEngine, RenderConfig};
//! use mvt_streamer::store::{connect, PostgisTileReader, ReaderStrategy, Repository, S3Options};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Arc::new(RenderConfig::load("config.yml").await?);
//!     let pool = connect("postgres://localhost/osm", 8).await?;
//!     let reader = Arc::new(PostgisTileReader::new(pool, config, ReaderStrategy::Fast));
//!     let writer = Arc::new(Repository::parse("/data/tiles")?.open(&S3Options::default()).await);
//!
//!     let tiles = build_work_set(reader.as_ref(), None, 0, 14).await?;
//!     let report = ExportEngine::new(8).run(tiles, reader, writer).await;
//!     println!("{} tiles written, {} failed", report.written, report.failed);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod fetch;
pub mod server;
pub mod store;
pub mod tile;

// Re-export commonly used types
pub use config::{Cli, Command, ExportConfig, RenderConfig, ServeConfig};
pub use error::{
    ConfigError, DeltaError, ExportError, FetchError, RepositoryError, StoreError, TileError,
    WorkSetError,
};
pub use export::{build_work_set, parse_delta, ExportEngine, ExportReport, WorkSet};
pub use server::{create_router, AppState, RouterConfig};
pub use store::{
    DataExtent, FileTileStore, PostgisTileReader, ReaderStrategy, Repository, RepositoryStore,
    S3TileStore, TileReader, TileWriter,
};
pub use tile::{enumerate, Envelope, Tile, TileRange, MAX_ZOOM};
