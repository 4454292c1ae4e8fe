//! HTTP request handlers for the MVT Streamer tile API.
//!
//! # Endpoints
//!
//! - `GET /style.json` - Style document pointing at this server
//! - `GET /tiles.json` - TileJSON document pointing at this server
//! - `GET /tiles/{z}/{x}/{y}.mvt` - Serve a vector tile
//! - `GET /health` - Health check endpoint

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, error};

use crate::config::RenderConfig;
use crate::error::StoreError;
use crate::store::TileReader;
use crate::tile::{Tile, TILE_CONTENT_ENCODING, TILE_CONTENT_TYPE, TILE_EXTENSION};

// =============================================================================
// Application State
// =============================================================================

/// Shared application state.
///
/// This is passed to all handlers via Axum's State extractor. Everything in it
/// is read-only after startup.
pub struct AppState<R: TileReader + ?Sized> {
    /// Source of tile bytes
    pub reader: Arc<R>,

    /// Rendering configuration holding the style and tileset documents
    pub config: Arc<RenderConfig>,

    /// Host used in rewritten URLs when a request carries no `Host` header
    pub fallback_host: String,
}

impl<R: TileReader + ?Sized> AppState<R> {
    pub fn new(reader: Arc<R>, config: Arc<RenderConfig>, fallback_host: impl Into<String>) -> Self {
        Self {
            reader,
            config,
            fallback_host: fallback_host.into(),
        }
    }

    /// Host (and port) the client used to reach this server.
    fn request_host<'a>(&'a self, headers: &'a HeaderMap) -> &'a str {
        headers
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .filter(|host| !host.is_empty())
            .unwrap_or(&self.fallback_host)
    }
}

impl<R: TileReader + ?Sized> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            reader: Arc::clone(&self.reader),
            config: Arc::clone(&self.config),
            fallback_host: self.fallback_host.clone(),
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Path parameters for tile requests.
///
/// Extracted from: `/tiles/{z}/{x}/{filename}` where filename is `{y}.mvt`.
/// Coordinates are kept as text so that malformed values map to 404 rather
/// than to a rejection.
#[derive(Debug, Deserialize)]
pub struct TilePathParams {
    pub z: String,
    pub x: String,
    pub filename: String,
}

impl TilePathParams {
    /// The addressed tile, if the path names a valid one.
    pub fn tile(&self) -> Option<Tile> {
        let z: u8 = self.z.parse().ok()?;
        let x: u32 = self.x.parse().ok()?;
        let y: u32 = self
            .filename
            .strip_suffix(TILE_EXTENSION)?
            .strip_suffix('.')?
            .parse()
            .ok()?;
        Tile::new(x, y, z).ok()
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Document Rewriting
// =============================================================================

/// Point every source of a style document at this server's TileJSON.
///
/// When the style declares no source, a vector source named `source_id` is
/// added.
pub fn rewrite_style(style: &Value, source_id: &str, host: &str) -> Value {
    let mut style = style.clone();
    let url = Value::String(format!("http://{}/tiles.json", host));

    if let Some(document) = style.as_object_mut() {
        let sources = document
            .entry("sources")
            .or_insert_with(|| Value::Object(Map::new()));
        if !sources.is_object() {
            *sources = Value::Object(Map::new());
        }
        if let Some(sources) = sources.as_object_mut() {
            if sources.is_empty() {
                sources.insert(source_id.to_string(), json!({ "type": "vector" }));
            }
            for source in sources.values_mut() {
                if let Some(source) = source.as_object_mut() {
                    source.insert("url".to_string(), url.clone());
                }
            }
        }
    }
    style
}

/// Point the tile URL template of a TileJSON document at this server.
pub fn rewrite_tileset(tileset: &Value, host: &str) -> Value {
    let mut tileset = tileset.clone();
    if let Some(document) = tileset.as_object_mut() {
        document.insert(
            "tiles".to_string(),
            json!([format!(
                "http://{}/tiles/{{z}}/{{x}}/{{y}}.{}",
                host, TILE_EXTENSION
            )]),
        );
    }
    tileset
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle style requests.
///
/// # Endpoint
///
/// `GET /style.json`
///
/// Returns the configured style with every `sources.<name>.url` rewritten to
/// `http://<host>/tiles.json`, where `<host>` is the request's `Host` header.
pub async fn style_handler<R: TileReader + ?Sized>(
    State(state): State<AppState<R>>,
    headers: HeaderMap,
) -> Json<Value> {
    let host = state.request_host(&headers);
    Json(rewrite_style(&state.config.style, &state.config.id, host))
}

/// Handle tileset requests.
///
/// # Endpoint
///
/// `GET /tiles.json`
///
/// Returns the configured TileJSON with `tiles` rewritten to
/// `["http://<host>/tiles/{z}/{x}/{y}.mvt"]`.
pub async fn tileset_handler<R: TileReader + ?Sized>(
    State(state): State<AppState<R>>,
    headers: HeaderMap,
) -> Json<Value> {
    let host = state.request_host(&headers);
    Json(rewrite_tileset(&state.config.tileset, host))
}

/// Handle tile requests.
///
/// # Endpoint
///
/// `GET /tiles/{z}/{x}/{y}.mvt`
///
/// # Response
///
/// - `200 OK`: gzipped vector tile
/// - `204 No Content`: the tile has no content
/// - `404 Not Found`: invalid coordinates, or the store failed (logged, never
///   exposed to the client)
///
/// # Headers
///
/// - `Content-Type: application/vnd.mapbox-vector-tile`
/// - `Content-Encoding: gzip`
/// - `Access-Control-Allow-Origin: *`
pub async fn tile_handler<R: TileReader + ?Sized>(
    State(state): State<AppState<R>>,
    Path(params): Path<TilePathParams>,
) -> Response {
    let Some(tile) = params.tile() else {
        debug!(
            z = %params.z,
            x = %params.x,
            filename = %params.filename,
            "Rejected invalid tile path"
        );
        return StatusCode::NOT_FOUND.into_response();
    };

    match state.reader.read(tile).await {
        Ok(Some(bytes)) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, TILE_CONTENT_TYPE),
                (header::CONTENT_ENCODING, TILE_CONTENT_ENCODING),
                (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            ],
            bytes,
        )
            .into_response(),
        Ok(None) => StatusCode::NO_CONTENT.into_response(),
        Err(StoreError::NotFound(location)) => {
            debug!(z = tile.z(), x = tile.x(), y = tile.y(), location = %location, "Tile not found");
            StatusCode::NOT_FOUND.into_response()
        }
        Err(e) => {
            error!(z = tile.z(), x = tile.x(), y = tile.y(), error = %e, "Failed to read tile");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================
