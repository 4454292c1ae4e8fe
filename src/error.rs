use thiserror::Error;

use crate::tile::Tile;

/// Errors raised when constructing tile addresses
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TileError {
    /// Zoom level above the supported maximum
    #[error("Invalid zoom level: {zoom} (maximum is {max})")]
    InvalidZoom { zoom: u8, max: u8 },

    /// Column or row outside `[0, 2^z)`
    #[error("Tile {x}/{y} is out of range at zoom {z} (valid range: 0-{max})")]
    OutOfRange { x: u32, y: u32, z: u8, max: u32 },
}

/// Errors from reading or writing tile bytes
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Local filesystem failure
    #[error("I/O error: {0}")]
    Io(String),

    /// Error from S3 or S3-compatible storage
    #[error("S3 error: {0}")]
    S3(String),

    /// Query or connectivity failure against the spatial database
    #[error("Database error: {0}")]
    Database(String),

    /// Failure turning query results into a tile payload
    #[error("Render error: {0}")]
    Render(String),

    /// Tile not present in the store
    #[error("Tile not found: {0}")]
    NotFound(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

/// Errors selecting a tile repository from its identifier
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// Neither an existing local directory nor a supported URI
    #[error("Unsupported repository: {0} (expected an existing directory or s3://bucket/prefix)")]
    Unsupported(String),

    /// Malformed object store URI
    #[error("Invalid S3 URI {uri}: {reason}")]
    InvalidS3Uri { uri: String, reason: String },
}

/// Errors parsing a delta file
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeltaError {
    /// A record is not a valid `x,y,z` triple
    #[error("Malformed delta record on line {line} ({record:?}): {reason}")]
    Malformed {
        line: usize,
        record: String,
        reason: String,
    },
}

/// Errors loading a local or remote resource
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Local file could not be read
    #[error("Failed to read {location}: {message}")]
    Io { location: String, message: String },

    /// Remote resource could not be downloaded
    #[error("Failed to fetch {location}: {message}")]
    Http { location: String, message: String },
}

/// Errors loading the rendering configuration
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Document is not valid YAML / JSON for the expected schema
    #[error("Failed to parse configuration {location}: {message}")]
    Parse { location: String, message: String },

    /// Document parsed but is semantically invalid
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Per-tile failures recorded by the export engine
#[derive(Debug, Clone, Error)]
pub enum ExportError {
    #[error("Failed to read tile {tile}: {source}")]
    Read { tile: Tile, source: StoreError },

    #[error("Failed to write tile {tile}: {source}")]
    Write { tile: Tile, source: StoreError },

    /// The worker processing this tile panicked
    #[error("Worker aborted while processing tile {tile}: {message}")]
    Aborted { tile: Tile, message: String },
}

impl ExportError {
    /// The tile this failure belongs to.
    pub fn tile(&self) -> Tile {
        match self {
            ExportError::Read { tile, .. }
            | ExportError::Write { tile, .. }
            | ExportError::Aborted { tile, .. } => *tile,
        }
    }
}

/// Errors building the set of tiles an export run processes
#[derive(Debug, Clone, Error)]
pub enum WorkSetError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Delta(#[from] DeltaError),

    /// The data extent could not be queried
    #[error("Failed to compute the data extent: {0}")]
    Extent(#[from] StoreError),
}
