//! Delta files.
//!
//! A delta lists tiles whose underlying data changed, one `x,y,z` record per
//! line with no header. Blank lines are ignored; any other malformed record
//! rejects the whole file.

use std::fmt::Write;

use crate::error::DeltaError;
use crate::tile::Tile;

/// Parse the records of a delta file.
///
/// Records are returned in file order, duplicates included.
pub fn parse_delta(text: &str) -> Result<Vec<Tile>, DeltaError> {
    let mut tiles = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let record = line.trim();
        if record.is_empty() {
            continue;
        }
        tiles.push(parse_record(record).map_err(|reason| DeltaError::Malformed {
            line: index + 1,
            record: record.to_string(),
            reason,
        })?);
    }
    Ok(tiles)
}

fn parse_record(record: &str) -> Result<Tile, String> {
    let fields: Vec<&str> = record.split(',').map(str::trim).collect();
    let [x, y, z] = fields.as_slice() else {
        return Err(format!("expected 3 fields, found {}", fields.len()));
    };

    let x: u32 = x.parse().map_err(|_| format!("invalid x {:?}", x))?;
    let y: u32 = y.parse().map_err(|_| format!("invalid y {:?}", y))?;
    let z: u8 = z.parse().map_err(|_| format!("invalid z {:?}", z))?;

    Tile::new(x, y, z).map_err(|e| e.to_string())
}

/// Render tiles in delta format, one record per line.
pub fn format_delta<'a>(tiles: impl IntoIterator<Item = &'a Tile>) -> String {
    let mut out = String::new();
    for tile in tiles {
        let _ = writeln!(out, "{},{},{}", tile.x(), tile.y(), tile.z());
    }
    out
}
