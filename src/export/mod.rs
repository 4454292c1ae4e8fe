//! Tile export pipeline.
//!
//! ```text
//! delta file ──► parse_delta ──┐
//!                              ├──► WorkSet ──► ExportEngine ──► ExportReport
//! DataExtent ──► extent ───────┘                  │   ▲
//!                                         read    │   │  write
//!                                                 ▼   │
//!                                       TileReader   TileWriter
//! ```
//!
//! - [`workset`]: decides which tiles a run (re)generates
//! - [`delta`]: the `x,y,z` change-list format
//! - [`engine`]: runs the work set through reader and writer

pub mod delta;
pub mod engine;
pub mod workset;

pub use delta::{format_delta, parse_delta};
pub use engine::{ExportEngine, ExportReport, MAX_RECORDED_ERRORS};
pub use workset::{build_work_set, WorkSet};
