//! Configuration management for MVT Streamer.
//!
//! - [`cli`]: command-line arguments and environment variables via clap
//! - [`render`]: the layer/tileset/style configuration loaded at startup

pub mod cli;
pub mod render;

pub use cli::{
    available_parallelism, Cli, Command, ExportConfig, ServeConfig, DEFAULT_HOST,
    DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM, DEFAULT_PORT, DEFAULT_REGION, DEFAULT_REQUEST_TIMEOUT,
};
pub use render::{ConfigFormat, Layer, Query, RenderConfig};
