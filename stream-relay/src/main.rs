//! stream-relay binary entry point.
//!
//! Usage:
//! ```bash
//! stream-relay --config relay.toml
//! stream-relay --bind 127.0.0.1:3000 --log-json
//! RUST_LOG=stream_relay=debug stream-relay
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use stream_relay::cleanup::spawn_cleanup_task;
use stream_relay::http::{build_router, health::init_start_time};
use stream_relay::{Config, StreamRelay};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "relay.toml";

/// Event-stream relay for streaming chat agents.
#[derive(Parser, Debug)]
#[command(name = "stream-relay")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file; a missing default file means built-in defaults
    #[arg(long, short, env = "STREAM_RELAY_CONFIG", default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Override `server.bind_address`
    #[arg(long, env = "STREAM_RELAY_BIND")]
    bind: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let mut config = load_config(&cli.config)?;
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }

    init_start_time();
    let bind_address = config.server.bind_address.clone();
    let cleanup = config.cleanup.clone();

    let relay = Arc::new(StreamRelay::with_echo_agent(config));
    let cleanup_handle = spawn_cleanup_task(Arc::clone(&relay), cleanup);
    let app = build_router(relay);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {bind_address}"))?;
    tracing::info!(
        address = %bind_address,
        version = env!("CARGO_PKG_VERSION"),
        "stream-relay listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    cleanup_handle.abort();
    tracing::info!("stream-relay stopped");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: &std::path::Path) -> Result<Config> {
    if path == std::path::Path::new(DEFAULT_CONFIG) && !path.exists() {
        tracing::info!("No {} found, using defaults", DEFAULT_CONFIG);
        return Ok(Config::default());
    }
    let config = Config::from_file(path)?;
    tracing::info!(path = %path.display(), "Loaded configuration");
    Ok(config)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
