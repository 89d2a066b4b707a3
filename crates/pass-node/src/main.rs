//! # RevPass Pass Node
//!
//! Reads JSON request lines from stdin and writes one JSON response line
//! per request to stdout. Logs go to stderr.
//!
//! ## Environment Variables
//!
//! - `REVPASS_NAME`, `REVPASS_SYMBOL`, `REVPASS_MAX_SUPPLY`,
//!   `REVPASS_BASE_URI`, `REVPASS_ADMIN`: registry configuration
//! - `REVPASS_LOG_LEVEL` (or `RUST_LOG`): log filter, default `info`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;
use tracing::info;

use pass_node::{init_logging, load_config, serve, spawn_event_logger};
use pass_registry::adapters::{InMemoryEventBus, InMemoryFunds, SystemClock};
use pass_registry::service::PassRegistryService;

/// RevPass registry node.
#[derive(Parser, Debug)]
#[command(name = "pass-node")]
#[command(about = "Serve a RevPass registry over JSON lines on stdin/stdout")]
struct Args {
    /// JSON registry config file; environment variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `pass_registry=trace`
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_level.as_deref())?;

    let config = load_config(args.config.as_deref())?;
    let bus = Arc::new(InMemoryEventBus::with_capacity(config.event_capacity));
    let logger = spawn_event_logger(bus.subscribe());

    let service = PassRegistryService::with_shared(
        config,
        Arc::new(SystemClock),
        Arc::new(InMemoryFunds::new()),
        bus,
    )?;

    info!("Pass node ready, reading requests from stdin");
    let answered = serve(
        &service,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await?;

    // Last bus handle goes with the service; the logger then drains and exits.
    drop(service);
    let events = logger.await.context("event logger task failed")?;

    info!(answered, events, "Request stream closed, shutting down");
    Ok(())
}
