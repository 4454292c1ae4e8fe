//! HTTP server layer for MVT Streamer.
//!
//! This module serves vector tiles and the metadata documents that point map
//! clients at them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │   GET /style.json   GET /tiles.json   GET /tiles/{z}/{x}/{y}.mvt│
//! │                                                                 │
//! │  ┌──────────────────────────┐  ┌────────────────────────────┐   │
//! │  │        handlers          │  │          routes            │   │
//! │  │ (requests, URL rewrite)  │  │ (cors, timeout, tracing)   │   │
//! │  └──────────────────────────┘  └────────────────────────────┘   │
//! └───────────────────────────────┬─────────────────────────────────┘
//!                                 │ read
//!                                 ▼
//!                            TileReader
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    health_handler, rewrite_style, rewrite_tileset, style_handler, tile_handler, tileset_handler,
    AppState, HealthResponse, TilePathParams,
};
pub use routes::{create_router, RouterConfig};
