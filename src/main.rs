//! MVT Streamer - export and serve vector tiles.
//!
//! This binary wires configuration, stores, the export engine and the HTTP
//! server together.

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mvt_streamer::{
    build_work_set,
    config::{available_parallelism, Cli, Command, ExportConfig, RenderConfig, ServeConfig},
    server::{create_router, RouterConfig},
    store::{connect, PostgisTileReader, Repository, S3Options, TileReader},
    ExportEngine,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Export(config) => run_export(config).await,
        Command::Serve(config) => run_serve(config).await,
    }
}

// =============================================================================
// Export Command
// =============================================================================

async fn run_export(config: ExportConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let parallelism = config.parallelism();
    info!(
        parallelism = parallelism,
        processors = available_parallelism(),
        "Starting export"
    );

    // Fail fast on the destination before touching the database
    let repository = match Repository::parse(&config.repository) {
        Ok(repository) => repository,
        Err(e) => {
            error!("Repository error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let render = match RenderConfig::load(&config.config).await {
        Ok(render) => Arc::new(render),
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let pool = match connect(&config.database, parallelism as u32).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to connect to the database: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let reader = Arc::new(PostgisTileReader::new(pool, render, config.reader));
    let writer = Arc::new(repository.open(&s3_options(&config.s3_endpoint, &config.s3_region)).await);

    let work_set = match build_work_set(
        reader.as_ref(),
        config.delta.as_deref(),
        config.min_zoom,
        config.max_zoom,
    )
    .await
    {
        Ok(work_set) => work_set,
        Err(e) => {
            error!("Failed to build the work set: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!(
        repository = %repository,
        min_zoom = config.min_zoom,
        max_zoom = config.max_zoom,
        tiles = work_set.tile_count(),
        "Exporting tiles"
    );

    let report = ExportEngine::new(parallelism)
        .run(work_set, reader, writer)
        .await;

    if !report.is_success() {
        warn!(
            failed = report.failed,
            "Some tiles failed to export; re-run them with --delta"
        );
        if let Some(path) = &config.failures {
            match report.write_failures(path).await {
                Ok(()) => info!(path = %path.display(), "Wrote failed tiles"),
                Err(e) => error!(path = %path.display(), error = %e, "Failed to write failed tiles"),
            }
        }
    }

    // Per-tile failures are reported through the logs, not the exit status
    ExitCode::SUCCESS
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let render = match RenderConfig::load(&config.config).await {
        Ok(render) => Arc::new(render),
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let router_config = build_router_config(&config);

    let router = if let Some(database) = &config.database {
        let pool = match connect(database, available_parallelism() as u32).await {
            Ok(pool) => pool,
            Err(e) => {
                error!("Failed to connect to the database: {}", e);
                return ExitCode::FAILURE;
            }
        };
        info!(reader = ?config.reader, "Rendering tiles from the database");
        let reader: Arc<dyn TileReader> =
            Arc::new(PostgisTileReader::new(pool, render.clone(), config.reader));
        create_router(reader, render, router_config)
    } else {
        let identifier = config.repository.as_deref().unwrap_or_default();
        let repository = match Repository::parse(identifier) {
            Ok(repository) => repository,
            Err(e) => {
                error!("Repository error: {}", e);
                return ExitCode::FAILURE;
            }
        };
        info!(repository = %repository, "Serving tiles from repository");
        let store = repository
            .open(&s3_options(&config.s3_endpoint, &config.s3_region))
            .await;
        let reader: Arc<dyn TileReader> = Arc::new(store);
        create_router(reader, render, router_config)
    };

    let addr = config.bind_address();

    info!("Server listening on: http://{}", addr);
    info!("  Style:   http://{}/style.json", addr);
    info!("  Tileset: http://{}/tiles.json", addr);
    info!("  Tiles:   http://{}/tiles/{{z}}/{{x}}/{{y}}.mvt", addr);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Helpers
// =============================================================================

/// Initialize the tracing subscriber for logging.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "mvt_streamer=debug,tower_http=debug"
    } else {
        "mvt_streamer=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn s3_options(endpoint: &Option<String>, region: &str) -> S3Options {
    S3Options {
        endpoint: endpoint.clone(),
        region: region.to_string(),
    }
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new(config.bind_address())
        .with_request_timeout(Duration::from_secs(config.request_timeout))
        .with_tracing(!config.no_tracing);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config
}
