//! Telemetry Hub Server
//!
//! Run with: cargo run --bin telemetry-hub
//!
//! # Configuration
//!
//! Settings come from the first config file found (see `Config::load_default`)
//! or `--config`, then environment variables, then the flags below.
//! Run `telemetry-cli init-config` for a commented template.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use telemetry_hub::api::{serve, AppState};
use telemetry_hub::config::{Config, ConfigSource};
use telemetry_hub::hub::TelemetryHub;

#[derive(Parser)]
#[command(name = "telemetry-hub")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Real-time telemetry relay between sensors and dashboards")]
struct Args {
    /// Config file path (default: search standard locations)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let (mut config, source) = match &args.config {
        Some(path) => {
            let config = Config::load_with_env(path)
                .with_context(|| format!("loading config from {}", path.display()))?;
            let source = ConfigSource {
                path: Some(path.clone()),
                ..ConfigSource::default()
            };
            (config, source)
        }
        None => Config::load_default(),
    };
    if let Some(host) = args.host {
        config.api.host = host;
    }
    if let Some(port) = args.port {
        config.api.port = port;
    }

    telemetry_hub::logging::init(&config.logging);

    tracing::info!("Starting telemetry hub v{}", env!("CARGO_PKG_VERSION"));
    for error in &source.skipped {
        tracing::warn!("Skipping config file: {}", error);
    }
    match &source.path {
        Some(path) => tracing::info!("Loaded config from {:?}", path),
        None => tracing::info!("Using default config with environment overrides"),
    }
    tracing::info!(
        subscriber_buffer = config.hub.subscriber_buffer,
        send_timeout_ms = config.api.send_timeout_ms,
        "Hub configured"
    );

    let hub = Arc::new(TelemetryHub::new(config.hub.clone()));
    let state = AppState::new(Arc::clone(&hub), config.api.clone());

    serve(state).await.context("running API server")?;

    tracing::info!("Final hub stats: {}", hub.stats());
    tracing::info!("Telemetry hub stopped");

    Ok(())
}
