//! Router configuration for MVT Streamer.
//!
//! This module defines the HTTP routes and applies middleware for CORS,
//! request timeouts and tracing.
//!
//! # Route Structure
//!
//! ```text
//! /health                     - Health check
//! /style.json                 - Style document (CORS)
//! /tiles.json                 - TileJSON document (CORS)
//! /tiles/{z}/{x}/{y}.mvt      - Tile endpoint
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use mvt_streamer::server::{create_router, RouterConfig};
//! use mvt_streamer::store::{Repository, S3Options};
//!
//! let store = Repository::parse("/data/tiles")?.open(&S3Options::default()).await;
//! let config = RouterConfig::new("localhost:9000")
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//!
//! let router = create_router(Arc::new(store), Arc::new(render_config), config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:9000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use http::header::CONTENT_TYPE;
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{health_handler, style_handler, tile_handler, tileset_handler, AppState};
use crate::config::{RenderConfig, DEFAULT_REQUEST_TIMEOUT};
use crate::store::TileReader;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Host used in rewritten metadata URLs when a request has no `Host` header
    pub public_host: String,

    /// Allowed CORS origins for the metadata routes (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Per-request timeout
    pub request_timeout: Duration,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a new router configuration.
    ///
    /// By default:
    /// - CORS allows any origin
    /// - Requests time out after 30 seconds
    /// - Tracing is enabled
    pub fn new(public_host: impl Into<String>) -> Self {
        Self {
            public_host: public_host.into(),
            cors_origins: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT),
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Set the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// The tile route sets its own permissive `Access-Control-Allow-Origin`
/// header, so the CORS layer only wraps the metadata routes.
pub fn create_router<R>(reader: Arc<R>, render: Arc<RenderConfig>, config: RouterConfig) -> Router
where
    R: TileReader + ?Sized + 'static,
{
    let app_state = AppState::new(reader, render, config.public_host.clone());

    let cors = build_cors_layer(&config);

    let metadata_routes = Router::new()
        .route("/style.json", get(style_handler::<R>))
        .route("/tiles.json", get(tileset_handler::<R>))
        .with_state(app_state.clone())
        .layer(cors);

    // Uses {filename} to capture "{y}.mvt"
    let tile_routes = Router::new()
        .route("/tiles/{z}/{x}/{filename}", get(tile_handler::<R>))
        .with_state(app_state);

    let router = Router::new()
        .route("/health", get(health_handler))
        .merge(metadata_routes)
        .merge(tile_routes)
        .layer(TimeoutLayer::new(config.request_timeout));

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
