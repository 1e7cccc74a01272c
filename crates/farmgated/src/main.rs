//! farmgated - Farm Gateway Daemon
//!
//! Serves the dashboard's gateway API and forwards operations to the farm
//! control plane over whichever transport is installed.
//!
//! Usage:
//!   farmgated [OPTIONS]
//!
//! Without a config file, every setting takes its default and the control
//! plane address must be supplied per request (or with `--address`).

mod config;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use farmgate_api::{create_router, AppState};
use farmgate_core::SensorAnalysisEngine;
use farmgate_transport::ConnectionResolver;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::DaemonConfig;

#[derive(Parser, Debug)]
#[command(name = "farmgated")]
#[command(about = "Farm gateway daemon")]
struct Args {
    /// Configuration file path (TOML format)
    #[arg(short, long, env = "FARMGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind (overrides config)
    #[arg(long)]
    bind: Option<std::net::IpAddr>,

    /// Default control-plane address, e.g. 192.168.1.50:50051 (overrides config)
    #[arg(short, long, env = "FARMGATE_CONTROL_PLANE")]
    address: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "farmgated=info,farmgate_api=info,farmgate_transport=debug,tower_http=info".into()
    });
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.log_json);

    tracing::info!("Starting farmgated (Farm Gateway Daemon)");

    let mut config = match &args.config {
        Some(path) => {
            tracing::info!("Loading config from: {}", path.display());
            DaemonConfig::load(path)?
        }
        None => {
            tracing::info!("No config file provided, using defaults");
            DaemonConfig::default()
        }
    };

    // CLI overrides
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if args.address.is_some() {
        config.control_plane.default_address = args.address;
    }

    let resolver = ConnectionResolver::from_config(&config.control_plane, config.deadlines.clone())
        .context("Failed to set up control-plane transports")?;
    let engine = SensorAnalysisEngine::new(config.analysis.clone());
    let state = AppState::new(resolver, engine)
        .with_default_address(config.control_plane.default_address.clone());

    match &config.control_plane.default_address {
        Some(address) => tracing::info!(address = %address, "Default control plane"),
        None => tracing::warn!("No default control plane; requests must carry an address"),
    }

    let app = create_router(state);

    let addr: SocketAddr = config.server.socket_addr();
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("farmgated stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
