//! # Vendor Gateway
//!
//! OpenAI-compatible gateway that routes requests across interchangeable
//! LLM vendors.
//!
//! ## Usage
//!
//! ```bash
//! # Start with the default configuration path (/app/config)
//! vendor-gateway
//!
//! # Start with a custom config file
//! vendor-gateway --config /path/to/config.yaml
//!
//! # Start with environment overrides
//! GATEWAY_PORT=9000 DEFAULT_VENDOR=openrouter vendor-gateway
//! ```

use anyhow::Context;
use clap::Parser;
use gateway_config::{
    load_config_from, report_config_warnings, GatewayConfig, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH,
};
use gateway_routing::VendorManager;
use gateway_server::{AppState, Server, ServerConfig};
use gateway_telemetry::{init_logging, LogFormat, LoggingConfig, Metrics};
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Command-line arguments
#[derive(Debug, Parser)]
#[command(name = "vendor-gateway", version, about = "OpenAI-compatible multi-vendor LLM gateway")]
struct Args {
    /// Configuration file (YAML, or TOML with a .toml extension)
    #[arg(short, long, env = CONFIG_PATH_ENV, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

/// Application entry point
#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = run(args).await {
        error!(error = %e, "Application failed");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

/// Main application logic
async fn run(args: Args) -> anyhow::Result<()> {
    let config = load_config_from(&args.config)
        .await
        .with_context(|| format!("failed to load configuration from {}", args.config.display()))?;

    init_tracing(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config.display(),
        vendors = config.vendors.len(),
        rules = config.models.len(),
        "Starting vendor gateway"
    );

    let manager = VendorManager::builder(config.clone())
        .build()
        .await
        .context("failed to initialize vendors")?;

    info!(
        vendors = ?manager.vendor_names(),
        default_vendor = %manager.default_vendor_name(),
        "Vendor registry initialized"
    );

    let metrics = Metrics::new().context("failed to register metrics")?;
    let server_config = ServerConfig::from(&config.server);
    let state = AppState::builder()
        .config(config)
        .manager(manager)
        .metrics(metrics)
        .build()
        .context("failed to build application state")?;

    Server::new(server_config, state).run().await?;
    Ok(())
}

fn init_tracing(config: &GatewayConfig) {
    let format = config.logging.format.parse::<LogFormat>().unwrap_or_else(|e| {
        eprintln!("{e}; using pretty output");
        LogFormat::Pretty
    });

    if let Err(e) = init_logging(&LoggingConfig::new(config.logging.level.clone(), format)) {
        eprintln!("Failed to initialize logging: {e}");
        return;
    }

    // Loading ran before a subscriber existed
    report_config_warnings(config);

    if config.vendors.is_empty() {
        warn!("No vendors configured; every request goes to the default endpoint");
    }
}
