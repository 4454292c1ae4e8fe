//! Rendering configuration.
//!
//! The rendering configuration describes the vector layers a tile is made of
//! (one or more zoom-bounded SQL queries per layer) and carries the TileJSON
//! and style documents published by the server. It is loaded once at startup
//! and shared read-only afterwards.
//!
//! ```yaml
//! id: osm
//! tileset:
//!   tilejson: 2.2.0
//!   minzoom: 0
//!   maxzoom: 14
//! style:
//!   version: 8
//!   sources: {}
//!   layers: []
//! layers:
//!   - id: buildings
//!     queries:
//!       - minzoom: 13
//!         maxzoom: 20
//!         sql: SELECT id, tags, geom FROM osm_ways WHERE tags ? 'building'
//! ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::error::ConfigError;
use crate::fetch::fetch_text;
use crate::tile::MAX_ZOOM;

/// Document format of a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Pick the format from the location's extension; YAML unless `.json`.
    pub fn from_location(location: &str) -> Self {
        let path = location.split(['?', '#']).next().unwrap_or(location);
        if path.to_ascii_lowercase().ends_with(".json") {
            ConfigFormat::Json
        } else {
            ConfigFormat::Yaml
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Name of the tileset, also used as the default style source name.
    #[serde(default = "default_id")]
    pub id: String,

    /// TileJSON document served at `/tiles.json`.
    #[serde(default = "default_tileset")]
    pub tileset: Value,

    /// Style document served at `/style.json`.
    #[serde(default = "default_style")]
    pub style: Value,

    /// Vector layers, in the order they are written into a tile.
    #[serde(default)]
    pub layers: Vec<Layer>,

    /// Query returning the data extent as `(xmin, ymin, xmax, ymax)` in WGS84.
    #[serde(default)]
    pub extent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: String,

    #[serde(default)]
    pub queries: Vec<Query>,
}

/// A SQL query returning `(id, tags, geom)` rows, active on `[minzoom, maxzoom]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    #[serde(default)]
    pub minzoom: u8,

    #[serde(default = "default_query_maxzoom")]
    pub maxzoom: u8,

    pub sql: String,
}

fn default_id() -> String {
    "tiles".to_string()
}

fn default_tileset() -> Value {
    json!({ "tilejson": "2.2.0" })
}

fn default_style() -> Value {
    json!({ "version": 8, "sources": {}, "layers": [] })
}

fn default_query_maxzoom() -> u8 {
    MAX_ZOOM
}

impl Layer {
    /// Queries active at `zoom`.
    pub fn queries_at(&self, zoom: u8) -> impl Iterator<Item = &Query> {
        self.queries
            .iter()
            .filter(move |q| q.minzoom <= zoom && zoom <= q.maxzoom)
    }
}

impl RenderConfig {
    /// Parse a configuration document.
    pub fn parse(text: &str, format: ConfigFormat, location: &str) -> Result<Self, ConfigError> {
        let parse_err = |message: String| ConfigError::Parse {
            location: location.to_string(),
            message,
        };
        let config: RenderConfig = match format {
            ConfigFormat::Yaml => serde_yaml::from_str(text).map_err(|e| parse_err(e.to_string()))?,
            ConfigFormat::Json => serde_json::from_str(text).map_err(|e| parse_err(e.to_string()))?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Fetch and parse the configuration at a local path or URL.
    pub async fn load(location: &str) -> Result<Self, ConfigError> {
        let text = fetch_text(location).await?;
        let config = Self::parse(&text, ConfigFormat::from_location(location), location)?;
        info!(
            location = location,
            layers = config.layers.len(),
            "Loaded rendering configuration"
        );
        Ok(config)
    }

    /// Check the invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.tileset.is_object() {
            return Err(ConfigError::Invalid("tileset must be an object".to_string()));
        }
        if !self.style.is_object() {
            return Err(ConfigError::Invalid("style must be an object".to_string()));
        }

        let mut seen = HashSet::new();
        for layer in &self.layers {
            if layer.id.trim().is_empty() {
                return Err(ConfigError::Invalid("layer id must not be empty".to_string()));
            }
            if !seen.insert(layer.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate layer id: {}",
                    layer.id
                )));
            }
            for query in &layer.queries {
                if query.sql.trim().is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "layer {} has an empty query",
                        layer.id
                    )));
                }
                if query.minzoom > query.maxzoom {
                    return Err(ConfigError::Invalid(format!(
                        "layer {} has a query with minzoom {} > maxzoom {}",
                        layer.id, query.minzoom, query.maxzoom
                    )));
                }
            }
        }
        Ok(())
    }

    /// Layers with at least one query active at `zoom`.
    pub fn layers_at(&self, zoom: u8) -> impl Iterator<Item = &Layer> {
        self.layers
            .iter()
            .filter(move |layer| layer.queries_at(zoom).next().is_some())
    }
}
