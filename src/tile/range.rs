//! Lazy enumeration of the tiles covering an envelope over a zoom range.

use std::iter::FusedIterator;

use super::coord::{Envelope, Tile, TileBounds, MAX_ZOOM};

/// Iterator over every tile sharing area with an envelope, for each zoom level
/// in `[min_zoom, max_zoom]`.
///
/// Tiles that only touch the envelope along an edge or at a corner are not
/// included. Enumerating a tile's own envelope therefore yields the tile, its
/// ancestors and its descendants, never its neighbours. Zero-area envelopes
/// yield nothing.
///
/// Tiles are yielded zoom by zoom (ascending), and within a zoom level in
/// row-major order: `y` ascending, then `x` ascending. A single traversal never
/// yields the same tile twice. Zoom levels above [`MAX_ZOOM`] are skipped, and
/// `min_zoom > max_zoom` or an empty envelope yields nothing.
#[derive(Debug, Clone)]
pub struct TileRange {
    envelope: Envelope,
    zoom: u8,
    max_zoom: u8,
    bounds: Option<TileBounds>,
    x: u32,
    y: u32,
}

impl TileRange {
    pub fn new(envelope: Envelope, min_zoom: u8, max_zoom: u8) -> Self {
        let max_zoom = max_zoom.min(MAX_ZOOM);
        // An exhausted range is one whose current zoom is past the last level.
        let zoom = if envelope.is_empty() {
            max_zoom + 1
        } else {
            min_zoom
        };
        Self {
            envelope,
            zoom,
            max_zoom,
            bounds: None,
            x: 0,
            y: 0,
        }
    }

    /// The envelope being enumerated.
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Total number of tiles the range covers, from its first zoom level.
    ///
    /// Computed from the per-level index bounds, without iterating.
    pub fn tile_count(&self) -> u64 {
        if self.zoom > self.max_zoom {
            return 0;
        }
        (self.zoom..=self.max_zoom)
            .filter_map(|z| self.envelope.tile_bounds(z))
            .map(|bounds| bounds.count())
            .sum()
    }

    fn next_zoom(&mut self) {
        self.zoom += 1;
        self.bounds = None;
    }
}

impl Iterator for TileRange {
    type Item = Tile;

    fn next(&mut self) -> Option<Tile> {
        loop {
            if self.zoom > self.max_zoom {
                return None;
            }

            let bounds = match self.bounds {
                Some(bounds) => bounds,
                None => match self.envelope.tile_bounds(self.zoom) {
                    Some(bounds) => {
                        self.bounds = Some(bounds);
                        self.x = bounds.min_x;
                        self.y = bounds.min_y;
                        bounds
                    }
                    None => {
                        self.next_zoom();
                        continue;
                    }
                },
            };

            if self.y > bounds.max_y {
                self.next_zoom();
                continue;
            }

            // Bounds are clamped to the grid at this zoom.
            let tile = Tile::new_unchecked(self.x, self.y, self.zoom);

            if self.x == bounds.max_x {
                self.x = bounds.min_x;
                self.y += 1;
            } else {
                self.x += 1;
            }

            return Some(tile);
        }
    }
}

impl FusedIterator for TileRange {}

/// Enumerate the tiles covering `envelope` for every zoom level in
/// `[min_zoom, max_zoom]`.
pub fn enumerate(envelope: Envelope, min_zoom: u8, max_zoom: u8) -> TileRange {
    TileRange::new(envelope, min_zoom, max_zoom)
}
