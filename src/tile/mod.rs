//! Tile addressing.
//!
//! This module provides the tile coordinate model and the enumerator that
//! expands a geographic region into the tiles covering it.
//!
//! # Components
//!
//! - [`Tile`]: an `(x, y, z)` address in the XYZ Web Mercator scheme
//! - [`Envelope`]: an axis-aligned bounding box in WGS84 degrees
//! - [`TileRange`]: lazy iterator over the tiles covering an envelope across a
//!   zoom range, built with [`enumerate`]
//!
//! # Example
//!
//! ```
//! use mvt_streamer::tile::{enumerate, Tile};
//!
//! let tile = Tile::new(1, 2, 3).unwrap();
//!
//! // The tile itself plus its four children
//! let tiles: Vec<Tile> = enumerate(tile.envelope(), 3, 4).collect();
//! assert_eq!(tiles.len(), 5);
//! assert_eq!(tiles[0], tile);
//! ```

mod coord;
mod range;

pub use coord::{
    lat_to_tile_y, lon_to_tile_x, tile_x_to_lon, tile_y_to_lat, tiles_per_axis, Envelope, Tile,
    TileBounds, MAX_LATITUDE, MAX_LONGITUDE, MAX_ZOOM,
};
pub use range::{enumerate, TileRange};

/// File extension of stored vector tiles.
pub const TILE_EXTENSION: &str = "mvt";

/// Media type of Mapbox vector tiles.
pub const TILE_CONTENT_TYPE: &str = "application/vnd.mapbox-vector-tile";

/// Encoding applied to stored tile payloads.
pub const TILE_CONTENT_ENCODING: &str = "gzip";
