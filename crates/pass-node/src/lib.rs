//! # RevPass Pass Node
//!
//! Hosts one [`PassRegistryService`] and drives it from a JSON-lines
//! request stream.
//!
//! ## Startup Sequence
//!
//! 1. Initialise logging (stderr)
//! 2. Load configuration (file, then environment overrides)
//! 3. Build the service with the system clock, in-memory funds and event bus
//! 4. Spawn the event logger
//! 5. Serve requests until end of input

pub mod wire;

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use pass_registry::config::{RegistryConfig, ServiceConfig};
use pass_registry::domain::RegistryEvent;
use pass_registry::ports::outbound::{Clock, EventSink, FundsTransfer};
use pass_registry::service::PassRegistryService;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::wire::{malformed, RequestLine};

/// Install the stderr subscriber.
///
/// `level` wins over `REVPASS_LOG_LEVEL`, which wins over `RUST_LOG`;
/// the fallback is `info`.
///
/// # Errors
///
/// If the filter does not parse or a subscriber is already installed.
pub fn init_logging(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level).context("invalid log level")?,
        None => EnvFilter::try_from_env("REVPASS_LOG_LEVEL")
            .or_else(|_| EnvFilter::try_from_default_env())
            .or_else(|_| EnvFilter::try_new("info"))
            .context("invalid log filter")?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow!(e))
}

/// Load the service configuration.
///
/// With a file, the file is read first and environment variables are
/// applied on top. The admin must be set by one or the other.
///
/// # Errors
///
/// If the file is unreadable, a variable does not parse, or no admin is set.
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig> {
    let registry = match path {
        Some(path) => RegistryConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?
            .with_env_overrides()?,
        None => RegistryConfig::from_env()?,
    };
    registry
        .validate()
        .context("set REVPASS_ADMIN or \"admin\" in the config file")?;

    info!(
        name = %registry.name,
        symbol = %registry.symbol,
        max_supply = registry.max_supply,
        admin = %registry.admin,
        "Loaded registry configuration"
    );
    Ok(ServiceConfig::new(registry))
}

/// Log every registry event until the bus closes. Returns the count seen.
pub fn spawn_event_logger(mut events: broadcast::Receiver<RegistryEvent>) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut seen = 0u64;
        loop {
            match events.recv().await {
                Ok(event) => {
                    seen += 1;
                    info!(
                        topic = event.topic(),
                        pass_id = ?event.pass_id(),
                        ?event,
                        "Registry event"
                    );
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event logger lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
        seen
    })
}

/// Answer each request line of `input` with one response line on `output`.
///
/// Blank lines are skipped. Returns the number of requests answered.
///
/// # Errors
///
/// Only on I/O failure; malformed lines get an error response.
pub async fn serve<C, F, E, R, W>(
    service: &PassRegistryService<C, F, E>,
    input: R,
    mut output: W,
) -> Result<u64>
where
    C: Clock,
    F: FundsTransfer,
    E: EventSink,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut answered = 0u64;

    while let Some(line) = lines.next_line().await.context("reading request stream")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<RequestLine>(line) {
            Ok(request) => {
                let correlation_id = request.correlation_id.unwrap_or_else(Uuid::new_v4);
                service
                    .handle_request(request.caller, correlation_id, request.request)
                    .await
            }
            Err(err) => {
                warn!(error = %err, "Malformed request line");
                malformed(&err)
            }
        };

        let mut encoded = serde_json::to_vec(&response).context("encoding response")?;
        encoded.push(b'\n');
        output
            .write_all(&encoded)
            .await
            .context("writing response")?;
        output.flush().await.context("flushing response")?;
        answered += 1;
    }

    debug!(answered, "Request stream exhausted");
    Ok(answered)
}
