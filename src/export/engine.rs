//! Bounded-parallel export of a work set.
//!
//! A fixed number of worker tasks pull tiles from a shared iterator. Each tile
//! is read then written to completion before the worker takes the next one.
//! A tile the reader produced nothing for is stored as an empty payload, which
//! stores read back as "no content". A failing tile is logged and recorded in
//! the [`ExportReport`]; it never stops the other workers.
//!
//! There is no retry. Failed tiles can be re-exported by feeding
//! [`ExportReport::failed_tiles`] back as a delta; re-running a tile
//! overwrites its previous output.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use bytes::Bytes;
use tracing::{debug, error, info};

use super::delta::format_delta;
use crate::error::ExportError;
use crate::store::{TileReader, TileWriter};
use crate::tile::Tile;

/// Attempted-tile interval between progress log lines.
const PROGRESS_INTERVAL: u64 = 1000;

/// Number of failure causes kept in a report. Further failures are counted
/// and their tiles recorded, but their errors are only logged.
pub const MAX_RECORDED_ERRORS: usize = 100;

/// Outcome of one export run.
#[derive(Debug, Clone, Default)]
pub struct ExportReport {
    /// Tiles taken from the work set.
    pub attempted: u64,
    /// Tiles whose bytes were written.
    pub written: u64,
    /// Tiles the reader produced no content for (stored as empty payloads).
    pub empty: u64,
    /// Tiles that failed.
    pub failed: u64,
    /// Causes of the first [`MAX_RECORDED_ERRORS`] failures.
    pub errors: Vec<ExportError>,
    failed_tiles: Vec<Tile>,
}

impl ExportReport {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Failed tiles, sorted.
    pub fn failed_tiles(&self) -> Vec<Tile> {
        let mut tiles = self.failed_tiles.clone();
        tiles.sort();
        tiles.dedup();
        tiles
    }

    fn record_failure(&mut self, error: ExportError) {
        self.failed += 1;
        self.failed_tiles.push(error.tile());
        if self.errors.len() < MAX_RECORDED_ERRORS {
            self.errors.push(error);
        }
    }

    /// Write the failed tiles in delta format, so they can be re-run with `--delta`.
    pub async fn write_failures(&self, path: &Path) -> std::io::Result<()> {
        tokio::fs::write(path, format_delta(&self.failed_tiles())).await
    }

    fn merge(&mut self, other: ExportReport) {
        self.attempted += other.attempted;
        self.written += other.written;
        self.empty += other.empty;
        self.failed += other.failed;
        self.failed_tiles.extend(other.failed_tiles);
        let room = MAX_RECORDED_ERRORS.saturating_sub(self.errors.len());
        self.errors.extend(other.errors.into_iter().take(room));
    }
}

enum TileOutcome {
    Written,
    Empty,
}

/// Drives reader and writer over a work set with bounded parallelism.
#[derive(Debug, Clone)]
pub struct ExportEngine {
    parallelism: usize,
}

impl ExportEngine {
    /// Create an engine running at most `parallelism` tiles at once (minimum 1).
    pub fn new(parallelism: usize) -> Self {
        Self {
            parallelism: parallelism.max(1),
        }
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Export every tile of `tiles`, returning once each has been attempted.
    pub async fn run<I, R, W>(&self, tiles: I, reader: Arc<R>, writer: Arc<W>) -> ExportReport
    where
        I: Iterator<Item = Tile> + Send + 'static,
        R: TileReader + ?Sized + 'static,
        W: TileWriter + ?Sized + 'static,
    {
        let start = Instant::now();
        let queue = Arc::new(Mutex::new(tiles));
        let attempted = Arc::new(AtomicU64::new(0));

        info!(parallelism = self.parallelism, "Starting export");

        let mut handles = Vec::with_capacity(self.parallelism);
        for worker in 0..self.parallelism {
            let queue = queue.clone();
            let attempted = attempted.clone();
            let reader = reader.clone();
            let writer = writer.clone();
            handles.push(tokio::spawn(async move {
                run_worker(worker, queue, attempted, reader, writer).await
            }));
        }

        let mut report = ExportReport::default();
        for handle in handles {
            match handle.await {
                Ok(worker_report) => report.merge(worker_report),
                Err(e) => error!(error = %e, "Export worker terminated unexpectedly"),
            }
        }

        info!(
            attempted = report.attempted,
            written = report.written,
            empty = report.empty,
            failed = report.failed,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Export finished"
        );
        report
    }
}

fn next_tile<I: Iterator<Item = Tile>>(queue: &Mutex<I>) -> Option<Tile> {
    // A poisoned queue is still a valid iterator
    let mut tiles = queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    tiles.next()
}

async fn run_worker<I, R, W>(
    worker: usize,
    queue: Arc<Mutex<I>>,
    attempted: Arc<AtomicU64>,
    reader: Arc<R>,
    writer: Arc<W>,
) -> ExportReport
where
    I: Iterator<Item = Tile> + Send + 'static,
    R: TileReader + ?Sized + 'static,
    W: TileWriter + ?Sized + 'static,
{
    let mut report = ExportReport::default();

    while let Some(tile) = next_tile(&queue) {
        report.attempted += 1;

        // Run each tile in its own task so a panic is contained to that tile
        let reader = reader.clone();
        let writer = writer.clone();
        let outcome = tokio::spawn(async move { export_tile(tile, &*reader, &*writer).await })
            .await
            .unwrap_or_else(|e| {
                Err(ExportError::Aborted {
                    tile,
                    message: e.to_string(),
                })
            });

        match outcome {
            Ok(TileOutcome::Written) => report.written += 1,
            Ok(TileOutcome::Empty) => report.empty += 1,
            Err(e) => {
                error!(
                    z = tile.z(),
                    x = tile.x(),
                    y = tile.y(),
                    error = %e,
                    "Failed to export tile"
                );
                report.record_failure(e);
            }
        }

        let total = attempted.fetch_add(1, Ordering::Relaxed) + 1;
        if total % PROGRESS_INTERVAL == 0 {
            info!(attempted = total, "Export progress");
        }
    }

    debug!(
        worker = worker,
        attempted = report.attempted,
        "Export worker finished"
    );
    report
}

async fn export_tile<R, W>(tile: Tile, reader: &R, writer: &W) -> Result<TileOutcome, ExportError>
where
    R: TileReader + ?Sized,
    W: TileWriter + ?Sized,
{
    let bytes = reader
        .read(tile)
        .await
        .map_err(|source| ExportError::Read { tile, source })?;

    match bytes {
        Some(bytes) => {
            writer
                .write(tile, bytes)
                .await
                .map_err(|source| ExportError::Write { tile, source })?;
            Ok(TileOutcome::Written)
        }
        None => {
            writer
                .write(tile, Bytes::new())
                .await
                .map_err(|source| ExportError::Write { tile, source })?;
            Ok(TileOutcome::Empty)
        }
    }
}
