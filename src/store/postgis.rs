//! Tile reader rendering Mapbox Vector Tiles from a PostGIS database.
//!
//! Every layer of the [`RenderConfig`] contributes the queries active at the
//! requested zoom. Each layer becomes one `ST_AsMVT` aggregate; the encoded
//! layers are concatenated into a single tile (an MVT tile is a sequence of
//! layer messages, so byte concatenation is a valid merge) and gzipped.
//!
//! Two strategies are available:
//!
//! - [`ReaderStrategy::Slow`] runs one statement per layer and concatenates
//!   the results client-side.
//! - [`ReaderStrategy::Fast`] runs a single statement per tile that
//!   concatenates every layer with `||` server-side.
//!
//! Statements are built once per zoom level when the reader is created.
//! Queries must return `id`, `tags` and `geom` columns with geometries in
//! EPSG:3857.

use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use flate2::write::GzEncoder;
use flate2::Compression;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, info};

use super::{DataExtent, TileReader};
use crate::config::{Layer, RenderConfig};
use crate::error::StoreError;
use crate::tile::{Envelope, Tile, MAX_ZOOM};

/// MVT extent of a tile in integer coordinates.
const MVT_EXTENT: u32 = 4096;

/// Clipping buffer around each tile, in tile coordinates.
const MVT_BUFFER: u32 = 256;

/// Extent of the OSM tables, reprojected to WGS84.
pub const DEFAULT_EXTENT_QUERY: &str = "\
SELECT ST_XMin(e), ST_YMin(e), ST_XMax(e), ST_YMax(e) FROM (\
SELECT ST_Transform(ST_SetSRID(ST_Extent(geom)::geometry, 3857), 4326) AS e FROM (\
SELECT geom FROM osm_nodes UNION ALL SELECT geom FROM osm_ways UNION ALL SELECT geom FROM osm_relations\
) AS source) AS extent";

/// How the PostGIS reader issues its statements.
#[derive(clap::ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReaderStrategy {
    /// One statement per layer, concatenated client-side.
    #[default]
    Slow,
    /// One statement per tile, concatenated in the database.
    Fast,
}

/// Open a connection pool sized for `max_connections` concurrent tiles.
pub async fn connect(database: &str, max_connections: u32) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect(database)
        .await?;
    Ok(pool)
}

/// Build the statement rendering one layer at `zoom`.
///
/// The statement takes `$1 = z`, `$2 = x`, `$3 = y` and returns a single
/// `bytea` (empty when no feature intersects the tile). Returns `None` when
/// the layer has no query active at `zoom`.
pub fn layer_sql(layer: &Layer, zoom: u8) -> Option<String> {
    let queries: Vec<String> = layer
        .queries_at(zoom)
        .map(|q| format!("({})", q.sql.trim().trim_end_matches(';')))
        .collect();
    if queries.is_empty() {
        return None;
    }

    Some(format!(
        "SELECT COALESCE(ST_AsMVT(mvt_geom.*, {name}, {extent}, 'geom', 'id'), ''::bytea) FROM (\
SELECT ST_AsMVTGeom(source.geom, ST_TileEnvelope($1, $2, $3), {extent}, {buffer}, true) AS geom, \
source.tags, source.id \
FROM ({source}) AS source \
WHERE source.geom && ST_TileEnvelope($1, $2, $3)\
) AS mvt_geom",
        name = quote_literal(&layer.id),
        extent = MVT_EXTENT,
        buffer = MVT_BUFFER,
        source = queries.join(" UNION ALL "),
    ))
}

/// Statements to run for a tile at `zoom` under `strategy`.
fn zoom_statements(config: &RenderConfig, zoom: u8, strategy: ReaderStrategy) -> Vec<String> {
    let layers: Vec<String> = config
        .layers
        .iter()
        .filter_map(|layer| layer_sql(layer, zoom))
        .collect();

    match strategy {
        ReaderStrategy::Slow => layers,
        ReaderStrategy::Fast if layers.is_empty() => Vec::new(),
        ReaderStrategy::Fast => {
            let parts: Vec<String> = layers.iter().map(|sql| format!("({})", sql)).collect();
            vec![format!("SELECT {}", parts.join(" || "))]
        }
    }
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn gzip(data: &[u8]) -> Result<Bytes, StoreError> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| StoreError::Render(format!("gzip: {}", e)))?;
    let compressed = encoder
        .finish()
        .map_err(|e| StoreError::Render(format!("gzip: {}", e)))?;
    Ok(Bytes::from(compressed))
}

/// Renders tiles from PostGIS.
#[derive(Clone)]
pub struct PostgisTileReader {
    pool: PgPool,
    config: Arc<RenderConfig>,
    strategy: ReaderStrategy,
    /// Statements indexed by zoom level.
    statements: Arc<Vec<Vec<String>>>,
}

impl PostgisTileReader {
    pub fn new(pool: PgPool, config: Arc<RenderConfig>, strategy: ReaderStrategy) -> Self {
        let statements: Vec<Vec<String>> = (0..=MAX_ZOOM)
            .map(|zoom| zoom_statements(&config, zoom, strategy))
            .collect();
        info!(
            strategy = ?strategy,
            layers = config.layers.len(),
            "Created PostGIS tile reader"
        );
        Self {
            pool,
            config,
            strategy,
            statements: Arc::new(statements),
        }
    }

    pub fn strategy(&self) -> ReaderStrategy {
        self.strategy
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Statements executed for a tile at `zoom`.
    pub fn statements(&self, zoom: u8) -> &[String] {
        self.statements
            .get(zoom as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[async_trait]
impl TileReader for PostgisTileReader {
    async fn read(&self, tile: Tile) -> Result<Option<Bytes>, StoreError> {
        let statements = self.statements(tile.z());
        if statements.is_empty() {
            return Ok(None);
        }

        let mut payload = Vec::new();
        for sql in statements {
            let layer: Option<Vec<u8>> = sqlx::query_scalar(sql)
                .bind(tile.z() as i32)
                .bind(tile.x() as i32)
                .bind(tile.y() as i32)
                .fetch_one(&self.pool)
                .await?;
            if let Some(layer) = layer {
                payload.extend_from_slice(&layer);
            }
        }

        debug!(
            z = tile.z(),
            x = tile.x(),
            y = tile.y(),
            bytes = payload.len(),
            "Rendered tile"
        );

        if payload.is_empty() {
            Ok(None)
        } else {
            gzip(&payload).map(Some)
        }
    }
}

#[async_trait]
impl DataExtent for PostgisTileReader {
    async fn extent(&self) -> Result<Option<Envelope>, StoreError> {
        let sql = self.config.extent.as_deref().unwrap_or(DEFAULT_EXTENT_QUERY);
        let row: Option<(Option<f64>, Option<f64>, Option<f64>, Option<f64>)> =
            sqlx::query_as(sql).fetch_optional(&self.pool).await?;

        match row {
            Some((Some(min_x), Some(min_y), Some(max_x), Some(max_y))) => {
                let envelope = Envelope::new(min_x, min_y, max_x, max_y);
                info!(extent = %envelope, "Computed data extent");
                Ok(Some(envelope))
            }
            _ => Ok(None),
        }
    }
}
