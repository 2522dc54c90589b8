//! Pipeline bridge server.
//!
//! ```text
//!     Client ──▶ axum host ──▶ bridge middleware ──▶ inner engine
//!                                    │                    │
//!                                    │◀── InnerResponse ──┘
//!                                    │
//!                                    └──▶ next host stage (pass-through)
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use pipeline_bridge::bridge::{Bridge, BridgeOptions};
use pipeline_bridge::config::{load_config, BridgeConfig};
use pipeline_bridge::engine::echo::{pass_through_requested, EchoBootstrapper};
use pipeline_bridge::http::{host_fallback, HttpServer};
use pipeline_bridge::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "pipeline-bridge")]
#[command(about = "Bridge an HTTP host into an inner request engine", long_about = None)]
struct Args {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => BridgeConfig::default(),
    };

    logging::init_logging(&config.observability)?;

    tracing::info!("pipeline-bridge v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        scheme = %config.listener.scheme,
        config_file = ?args.config,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let options = BridgeOptions::from_config(&config).with_pass_through(pass_through_requested);
    let bridge = Arc::new(Bridge::new(EchoBootstrapper::default(), options)?);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        "Listening for connections"
    );

    let server = HttpServer::new(config, bridge, host_fallback());
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
