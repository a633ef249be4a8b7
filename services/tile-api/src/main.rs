//! Map tile server.
//!
//! Serves `/tiles/{z}/{x}/{y}.png` rendered on demand from one GeoTIFF,
//! with rendered tiles cached on disk or in memory.

use anyhow::{Context, Result};
use clap::Parser;
use std::{net::SocketAddr, sync::Arc};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tile_api::{build_router, AppState, CleanupConfig, CleanupTask, ServiceConfig};

#[derive(Parser, Debug)]
#[command(name = "tile-api")]
#[command(about = "On-demand raster map tile server")]
struct Args {
    /// Listen address
    #[arg(short, long, env = "TILE_LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    listen: String,

    /// Log filter (e.g. "info" or "tile_api=debug,tower_http=info")
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    log_level: String,

    /// Number of tokio worker threads (default: number of CPU cores)
    #[arg(long, env = "TILE_WORKER_THREADS")]
    worker_threads: Option<usize>,
}

fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(threads) = args.worker_threads {
        runtime_builder.worker_threads(threads);
    }

    let runtime = runtime_builder.build()?;
    runtime.block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .json()
        .init();

    if let Some(threads) = args.worker_threads {
        info!(threads, "Configured tokio worker threads");
    }

    let prometheus_handle = tile_api::metrics::install_recorder()?;
    info!("Prometheus metrics exporter initialized");

    let config = ServiceConfig::from_env()?;
    config.validate().context("invalid configuration")?;
    info!(config = ?config, "Starting tile server");

    // Fatal if neither the primary nor the fallback dataset opens
    let state = Arc::new(AppState::new(config).await?);

    CleanupTask::new(state.engine.cache().clone(), CleanupConfig::from_env()).spawn();

    let app = build_router(state, Some(prometheus_handle));

    let addr: SocketAddr = args.listen.parse().context("invalid listen address")?;
    info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
