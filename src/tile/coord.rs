//! Tile addresses and geographic envelopes.
//!
//! Tiles follow the XYZ Web Mercator scheme: the origin is the north-west
//! corner of the world, `x` grows eastward, `y` grows southward, and zoom
//! level `z` splits each axis into `2^z` tiles. Envelopes are expressed in
//! WGS84 degrees.

use std::cmp::Ordering;
use std::f64::consts::PI;
use std::fmt;

use crate::error::TileError;

/// Highest supported zoom level.
pub const MAX_ZOOM: u8 = 30;

/// Latitude limit of the Web Mercator projection.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Longitude limit.
pub const MAX_LONGITUDE: f64 = 180.0;

/// Number of tiles along one axis at the given zoom level.
#[inline]
pub fn tiles_per_axis(zoom: u8) -> u32 {
    1u32 << zoom
}

/// Fractional tile column of a longitude at the given zoom level.
#[inline]
pub fn lon_to_tile_x(lon: f64, zoom: u8) -> f64 {
    let lon = lon.clamp(-MAX_LONGITUDE, MAX_LONGITUDE);
    (lon + 180.0) / 360.0 * tiles_per_axis(zoom) as f64
}

/// Fractional tile row of a latitude at the given zoom level.
#[inline]
pub fn lat_to_tile_y(lat: f64, zoom: u8) -> f64 {
    let lat_rad = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * tiles_per_axis(zoom) as f64
}

/// Longitude of the western edge of a tile column.
#[inline]
pub fn tile_x_to_lon(x: f64, zoom: u8) -> f64 {
    x / tiles_per_axis(zoom) as f64 * 360.0 - 180.0
}

/// Latitude of the northern edge of a tile row.
#[inline]
pub fn tile_y_to_lat(y: f64, zoom: u8) -> f64 {
    let n = PI * (1.0 - 2.0 * y / tiles_per_axis(zoom) as f64);
    n.sinh().atan().to_degrees()
}

// =============================================================================
// Envelope
// =============================================================================

/// Axis-aligned bounding box in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Envelope {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// The whole area covered by the tiling scheme.
    pub fn world() -> Self {
        Self::new(-MAX_LONGITUDE, -MAX_LATITUDE, MAX_LONGITUDE, MAX_LATITUDE)
    }

    /// True when the envelope has no area (degenerate, inverted or NaN).
    pub fn is_empty(&self) -> bool {
        let finite = self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite();
        !finite || self.min_x >= self.max_x || self.min_y >= self.max_y
    }

    /// True when both envelopes share some area.
    pub fn intersects(&self, other: &Envelope) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.min_x < other.max_x
            && other.min_x < self.max_x
            && self.min_y < other.max_y
            && other.min_y < self.max_y
    }

    /// Range of tile indices covered by this envelope at `zoom`.
    ///
    /// Returns `None` for empty envelopes or envelopes entirely outside the
    /// projection's latitude limits.
    pub fn tile_bounds(&self, zoom: u8) -> Option<TileBounds> {
        if self.is_empty() || zoom > MAX_ZOOM {
            return None;
        }
        let last = (tiles_per_axis(zoom) - 1) as f64;
        let (min_x, max_x) = index_range(
            lon_to_tile_x(self.min_x, zoom),
            lon_to_tile_x(self.max_x, zoom),
            last,
        )?;
        // Rows grow southward, so the northern edge gives the smaller index.
        let (min_y, max_y) = index_range(
            lat_to_tile_y(self.max_y, zoom),
            lat_to_tile_y(self.min_y, zoom),
            last,
        )?;
        Some(TileBounds {
            zoom,
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}

/// Tolerance, in tile units, absorbing rounding at tile edges.
const EDGE_EPSILON: f64 = 1e-6;

/// Convert a fractional `[lo, hi]` span into the inclusive range of tile
/// indices sharing area with it, clamped to `[0, last]`. Tiles whose edge
/// coincides with `lo` or `hi` are excluded.
fn index_range(lo: f64, hi: f64, last: f64) -> Option<(u32, u32)> {
    let first = (lo + EDGE_EPSILON).floor().clamp(0.0, last);
    let end = ((hi - EDGE_EPSILON).ceil() - 1.0).clamp(0.0, last);
    if hi - lo <= EDGE_EPSILON || end < first {
        return None;
    }
    Some((first as u32, end as u32))
}

/// Inclusive tile index rectangle at a single zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileBounds {
    pub zoom: u8,
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl TileBounds {
    /// Number of tiles inside the rectangle.
    pub fn count(&self) -> u64 {
        (self.max_x - self.min_x + 1) as u64 * (self.max_y - self.min_y + 1) as u64
    }
}

// =============================================================================
// Tile
// =============================================================================

/// A tile address `(x, y, z)` with `0 <= x, y < 2^z`.
///
/// Tiles order by zoom, then row, then column, which is the order the
/// enumerator produces them in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tile {
    x: u32,
    y: u32,
    z: u8,
}

impl Tile {
    /// Create a tile, validating the zoom level and the coordinate range.
    pub fn new(x: u32, y: u32, z: u8) -> Result<Self, TileError> {
        if z > MAX_ZOOM {
            return Err(TileError::InvalidZoom { zoom: z, max: MAX_ZOOM });
        }
        let n = tiles_per_axis(z);
        if x >= n || y >= n {
            return Err(TileError::OutOfRange {
                x,
                y,
                z,
                max: n - 1,
            });
        }
        Ok(Self { x, y, z })
    }

    /// Build a tile from coordinates already known to be in range.
    #[inline]
    pub(super) fn new_unchecked(x: u32, y: u32, z: u8) -> Self {
        debug_assert!(z <= MAX_ZOOM && x < tiles_per_axis(z) && y < tiles_per_axis(z));
        Self { x, y, z }
    }

    /// Tile containing the given point at `zoom`.
    pub fn from_lon_lat(lon: f64, lat: f64, zoom: u8) -> Result<Self, TileError> {
        if zoom > MAX_ZOOM {
            return Err(TileError::InvalidZoom {
                zoom,
                max: MAX_ZOOM,
            });
        }
        let last = (tiles_per_axis(zoom) - 1) as f64;
        let x = lon_to_tile_x(lon, zoom).floor().clamp(0.0, last) as u32;
        let y = lat_to_tile_y(lat, zoom).floor().clamp(0.0, last) as u32;
        Ok(Self { x, y, z: zoom })
    }

    /// Column, growing eastward.
    #[inline]
    pub fn x(&self) -> u32 {
        self.x
    }

    /// Row, growing southward.
    #[inline]
    pub fn y(&self) -> u32 {
        self.y
    }

    /// Zoom level.
    #[inline]
    pub fn z(&self) -> u8 {
        self.z
    }

    /// Geographic footprint of the tile.
    pub fn envelope(&self) -> Envelope {
        let x = self.x as f64;
        let y = self.y as f64;
        Envelope {
            min_x: tile_x_to_lon(x, self.z),
            min_y: tile_y_to_lat(y + 1.0, self.z),
            max_x: tile_x_to_lon(x + 1.0, self.z),
            max_y: tile_y_to_lat(y, self.z),
        }
    }

    /// The tile one level up containing this one.
    pub fn parent(&self) -> Option<Tile> {
        if self.z == 0 {
            return None;
        }
        Some(Tile {
            x: self.x / 2,
            y: self.y / 2,
            z: self.z - 1,
        })
    }

    /// The four tiles one level down, in enumeration order.
    pub fn children(&self) -> Option<[Tile; 4]> {
        if self.z >= MAX_ZOOM {
            return None;
        }
        let (x, y, z) = (self.x * 2, self.y * 2, self.z + 1);
        Some([
            Tile { x, y, z },
            Tile { x: x + 1, y, z },
            Tile { x, y: y + 1, z },
            Tile { x: x + 1, y: y + 1, z },
        ])
    }

    /// Relative storage path `{z}/{x}/{y}.{extension}`.
    ///
    /// Shared by every repository backend so stores are interchangeable.
    pub fn path(&self, extension: &str) -> String {
        format!("{}/{}/{}.{}", self.z, self.x, self.y, extension)
    }
}

impl Ord for Tile {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.z, self.y, self.x).cmp(&(other.z, other.y, other.x))
    }
}

impl PartialOrd for Tile {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}
