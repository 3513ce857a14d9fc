//! CEC Bridge - command-line front end
//!
//! Scans the HDMI-CEC bus through `cec-client`, then runs an interactive
//! prompt while printing bus events.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

use cec_bridge::adapter::Adapter;
use cec_bridge::scan::{parse_scan_output, resolve_self};
use cec_bridge::{BridgeConfig, CecBridge, CecClientAdapter};

/// CEC Bridge - control HDMI-CEC devices through cec-client
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "cec-bridge.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// OSD name to advertise (overrides the config file)
    #[arg(short, long, env = "CEC_OSD_STRING")]
    osd_string: Option<String>,

    /// Scan the bus, print the devices and exit
    #[arg(long)]
    scan: bool,

    /// Print the scan table and events as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level)?;

    info!("Starting CEC Bridge v{}...", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let mut config = BridgeConfig::load_or_default(&args.config).await?;
    if let Some(osd_string) = args.osd_string {
        config.osd_string = osd_string;
        config = config.normalized();
    }

    if args.scan {
        return run_scan(&config, args.json).await;
    }

    let bridge = CecBridge::connect_cec_client(config)
        .await
        .context("Failed to start CEC session")?;
    info!(
        "Connected as {} ({})",
        bridge.self_key(),
        bridge.config().osd_string
    );

    let printer = tokio::spawn(cli::print_events(bridge.subscribe(), args.json));

    tokio::select! {
        result = cli::run_repl(bridge.clone()) => {
            if let Err(e) = result {
                warn!("REPL stopped: {}", e);
            }
        }
        _ = shutdown_signal() => {}
    }

    bridge.shutdown();
    printer.abort();

    info!("CEC Bridge shutdown complete");
    Ok(())
}

/// One-shot scan: print what is on the bus and who we are
async fn run_scan(config: &BridgeConfig, json: bool) -> Result<()> {
    let adapter = CecClientAdapter::new(config);
    let output = adapter.scan().await.context("CEC scan failed")?;
    let mut table = parse_scan_output(&output);

    match resolve_self(&table, &config.osd_string) {
        Some(key) => {
            table.set_self(&key);
        }
        None => warn!(
            "No device advertises OSD name '{}'",
            config.osd_string
        ),
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&table)?);
    } else {
        cli::print_devices(&table);
    }
    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!("Failed to install CTRL+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
