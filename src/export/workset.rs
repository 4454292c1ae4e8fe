//! Work sets: the unique tiles an export run must (re)generate.

use std::collections::{btree_set, BTreeSet};

use tracing::{info, warn};

use super::delta::parse_delta;
use crate::error::WorkSetError;
use crate::fetch::fetch_text;
use crate::store::DataExtent;
use crate::tile::{enumerate, Envelope, Tile, TileRange};

/// Tiles to process in one export run.
///
/// Each tile appears once. Full-mode sets are enumerated lazily from the data
/// extent; delta-mode sets are materialised to deduplicate the expansions of
/// overlapping changed tiles.
#[derive(Debug)]
pub enum WorkSet {
    /// Every tile covering the data extent.
    Full(TileRange),
    /// Tiles derived from a list of changed tiles, sorted.
    Delta(btree_set::IntoIter<Tile>),
}

impl WorkSet {
    /// Full mode: every tile in `[min_zoom, max_zoom]` covering `extent`.
    ///
    /// A missing extent (no data) produces an empty set.
    pub fn full(extent: Option<Envelope>, min_zoom: u8, max_zoom: u8) -> Self {
        let envelope = extent.unwrap_or_else(|| {
            warn!("Data source reported no extent, nothing to export");
            Envelope::new(0.0, 0.0, 0.0, 0.0)
        });
        WorkSet::Full(enumerate(envelope, min_zoom, max_zoom))
    }

    /// Delta mode: the deduplicated union of the enumerations of each
    /// changed tile's footprint over `[min_zoom, max_zoom]`.
    pub fn delta<'a>(
        changed: impl IntoIterator<Item = &'a Tile>,
        min_zoom: u8,
        max_zoom: u8,
    ) -> Self {
        let tiles: BTreeSet<Tile> = changed
            .into_iter()
            .flat_map(|tile| enumerate(tile.envelope(), min_zoom, max_zoom))
            .collect();
        WorkSet::Delta(tiles.into_iter())
    }

    /// Number of tiles remaining in the set.
    pub fn tile_count(&self) -> u64 {
        match self {
            WorkSet::Full(range) => range.tile_count(),
            WorkSet::Delta(tiles) => tiles.len() as u64,
        }
    }
}

impl Iterator for WorkSet {
    type Item = Tile;

    fn next(&mut self) -> Option<Tile> {
        match self {
            WorkSet::Full(range) => range.next(),
            WorkSet::Delta(tiles) => tiles.next(),
        }
    }
}

/// Build the work set for an export run.
///
/// With a `delta` location (path or URL) the delta file is fetched and
/// expanded; otherwise the data extent is queried from `source`. Any failure
/// here is fatal for the run.
pub async fn build_work_set<S>(
    source: &S,
    delta: Option<&str>,
    min_zoom: u8,
    max_zoom: u8,
) -> Result<WorkSet, WorkSetError>
where
    S: DataExtent + ?Sized,
{
    let work_set = match delta {
        Some(location) => {
            let text = fetch_text(location).await?;
            let changed = parse_delta(&text)?;
            let work_set = WorkSet::delta(&changed, min_zoom, max_zoom);
            info!(
                delta = location,
                changed = changed.len(),
                tiles = work_set.tile_count(),
                "Built delta work set"
            );
            work_set
        }
        None => {
            let extent = source.extent().await?;
            let work_set = WorkSet::full(extent, min_zoom, max_zoom);
            info!(tiles = work_set.tile_count(), "Built full work set");
            work_set
        }
    };
    Ok(work_set)
}
