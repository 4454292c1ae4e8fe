//! Command-line configuration for MVT Streamer.
//!
//! Two subcommands share this module:
//! - `export` renders tiles from PostGIS and stores them in a repository
//! - `serve` exposes a repository (or the database itself) over HTTP
//!
//! # Environment Variables
//!
//! Options can also be set via environment variables with the `MVT_` prefix:
//!
//! - `MVT_DATABASE` - PostgreSQL connection string
//! - `MVT_CONFIG` - Rendering configuration (path or URL)
//! - `MVT_REPOSITORY` - Tile repository (directory or `s3://bucket/prefix`)
//! - `MVT_READER` - Tile reader strategy: `slow` or `fast` (default: slow)
//! - `MVT_PARALLELISM` - Export worker count (default: available processors)
//! - `MVT_HOST` - Server bind address (default: 0.0.0.0)
//! - `MVT_PORT` - Server port (default: 9000)
//! - `MVT_REQUEST_TIMEOUT` - Per-request timeout in seconds (default: 30)
//! - `MVT_S3_ENDPOINT` - Custom S3 endpoint for S3-compatible services
//! - `MVT_S3_REGION` - AWS region (default: us-east-1)

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::store::ReaderStrategy;
use crate::tile::MAX_ZOOM;

// =============================================================================
// Default Values
// =============================================================================

/// Default minimal zoom level of an export.
pub const DEFAULT_MIN_ZOOM: u8 = 0;

/// Default maximal zoom level of an export.
pub const DEFAULT_MAX_ZOOM: u8 = 14;

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 9000;

/// Default AWS region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 30;

/// Number of processing units available to the process.
pub fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

// =============================================================================
// CLI Arguments
// =============================================================================

/// MVT Streamer - export and serve vector tiles.
#[derive(Parser, Debug, Clone)]
#[command(name = "mvt-streamer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Export vector tiles from the PostgreSQL database.
    Export(ExportConfig),

    /// Serve vector tiles over HTTP.
    Serve(ServeConfig),
}

// =============================================================================
// Export Command
// =============================================================================

#[derive(Parser, Debug, Clone)]
pub struct ExportConfig {
    /// PostgreSQL connection string of the PostGIS database.
    #[arg(long, env = "MVT_DATABASE")]
    pub database: String,

    /// Rendering configuration (YAML or JSON, local path or URL).
    #[arg(long, env = "MVT_CONFIG")]
    pub config: String,

    /// Tile repository: an existing directory or s3://bucket/prefix.
    #[arg(long, env = "MVT_REPOSITORY")]
    pub repository: String,

    /// Minimal zoom level.
    #[arg(long = "min-zoom", visible_alias = "minZoom", default_value_t = DEFAULT_MIN_ZOOM)]
    pub min_zoom: u8,

    /// Maximal zoom level.
    #[arg(long = "max-zoom", visible_alias = "maxZoom", default_value_t = DEFAULT_MAX_ZOOM)]
    pub max_zoom: u8,

    /// Tile reader strategy.
    #[arg(long, value_enum, default_value_t = ReaderStrategy::Slow, env = "MVT_READER")]
    pub reader: ReaderStrategy,

    /// Delta file listing changed tiles as x,y,z lines (local path or URL).
    ///
    /// When absent, every tile covering the data extent is exported.
    #[arg(long)]
    pub delta: Option<String>,

    /// Number of tiles processed concurrently (defaults to available processors).
    #[arg(long, env = "MVT_PARALLELISM")]
    pub parallelism: Option<usize>,

    /// Write the tiles that failed to export to this file, in delta format.
    #[arg(long)]
    pub failures: Option<PathBuf>,

    /// Custom S3 endpoint URL for S3-compatible services (MinIO, etc.).
    #[arg(long, env = "MVT_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// AWS region for S3.
    #[arg(long, default_value = DEFAULT_REGION, env = "MVT_S3_REGION")]
    pub s3_region: String,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl ExportConfig {
    /// Validate the configuration and return an error message if invalid.
    ///
    /// `min_zoom > max_zoom` is accepted and results in an empty export.
    pub fn validate(&self) -> Result<(), String> {
        if self.database.is_empty() {
            return Err("Database connection string is required. Set --database or MVT_DATABASE".to_string());
        }
        if self.config.is_empty() {
            return Err("Configuration is required. Set --config or MVT_CONFIG".to_string());
        }
        if self.repository.is_empty() {
            return Err("Repository is required. Set --repository or MVT_REPOSITORY".to_string());
        }
        if self.max_zoom > MAX_ZOOM {
            return Err(format!("max_zoom must be at most {}", MAX_ZOOM));
        }
        if self.parallelism == Some(0) {
            return Err("parallelism must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Worker count, defaulting to the number of available processors.
    pub fn parallelism(&self) -> usize {
        self.parallelism.unwrap_or_else(available_parallelism)
    }
}

// =============================================================================
// Serve Command
// =============================================================================

#[derive(Parser, Debug, Clone)]
pub struct ServeConfig {
    /// Rendering configuration (YAML or JSON, local path or URL).
    #[arg(long, env = "MVT_CONFIG")]
    pub config: String,

    /// Serve pre-rendered tiles from this repository.
    #[arg(long, env = "MVT_REPOSITORY", conflicts_with = "database")]
    pub repository: Option<String>,

    /// Render tiles on the fly from this PostgreSQL database.
    #[arg(long, env = "MVT_DATABASE")]
    pub database: Option<String>,

    /// Tile reader strategy when rendering from the database.
    #[arg(long, value_enum, default_value_t = ReaderStrategy::Slow, env = "MVT_READER")]
    pub reader: ReaderStrategy,

    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "MVT_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "MVT_PORT")]
    pub port: u16,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT, env = "MVT_REQUEST_TIMEOUT")]
    pub request_timeout: u64,

    /// Allowed CORS origins for the metadata endpoints (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "MVT_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    /// Custom S3 endpoint URL for S3-compatible services (MinIO, etc.).
    #[arg(long, env = "MVT_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// AWS region for S3.
    #[arg(long, default_value = DEFAULT_REGION, env = "MVT_S3_REGION")]
    pub s3_region: String,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.config.is_empty() {
            return Err("Configuration is required. Set --config or MVT_CONFIG".to_string());
        }
        match (&self.repository, &self.database) {
            (None, None) => {
                return Err(
                    "A tile source is required. Set --repository or --database".to_string(),
                )
            }
            (Some(_), Some(_)) => {
                return Err("--repository and --database are mutually exclusive".to_string())
            }
            _ => {}
        }
        if self.request_timeout == 0 {
            return Err("request_timeout must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// =============================================================================
// Tests
// =============================================================================
