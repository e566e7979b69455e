//! Lookup service binary for the Lineup catalog.
//!
//! Wires the CSV feed, the refresh controller and the HTTP API together and
//! serves lookups until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `lineup-config.yaml` (defaults if absent)
//! 2. Initialize structured logging (tracing)
//! 3. Build the CSV feed and the refresh controller
//! 4. Perform the initial catalog load (a failure is logged, not fatal)
//! 5. Start the periodic refresh loop
//! 6. Serve HTTP until `Ctrl-C`
//! 7. Stop the refresh loop

mod error;

use std::path::Path;
use std::sync::Arc;

use lineup_api::{AppState, ServerConfig};
use lineup_core::RefreshController;
use lineup_core::config::{LineupConfig, LoggingConfig};
use lineup_feed::CsvFileFeed;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::ServiceError;

/// Configuration file looked up in the working directory.
const CONFIG_FILE: &str = "lineup-config.yaml";

/// Application entry point for the lookup service.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the listener cannot bind,
/// or the refresh loop does not stop cleanly.
#[tokio::main]
async fn main() -> Result<(), ServiceError> {
    // 1. Load configuration. Logging is not up yet; errors go to stderr
    //    through the returned Result.
    let config_path = Path::new(CONFIG_FILE);
    let config = load_config(config_path)?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);

    info!(
        config_file = config_path.exists(),
        json_logs = config.logging.json,
        feed = config.feed.path,
        refresh_interval_secs = config.refresh.interval_secs,
        fuzzy_cutoff = config.matching.fuzzy_cutoff,
        venue = config.catalog.venue_name,
        "lineup-service starting"
    );

    // 3. Feed and controller.
    let feed = Arc::new(CsvFileFeed::new(&config.feed.path));
    let controller = Arc::new(RefreshController::new(
        feed,
        config.matching.similarity_options(),
    ));

    // 4. Initial load. The controller logs the fault; lookups answer 503
    //    until a later refresh succeeds.
    if controller.refresh_in_background().await.is_err() {
        warn!("Starting without a catalog");
    }

    // 5. Periodic refresh.
    let refresh_task = controller.spawn(config.refresh.interval());

    // 6. Serve.
    let state = Arc::new(AppState::from_config(controller.reader(), &config));
    let server_config = ServerConfig::from(&config.server);
    let served = lineup_api::start_server(&server_config, state, shutdown_signal()).await;

    // 7. Stop the refresh loop even if serving failed.
    let stats = refresh_task.shutdown().await?;
    served?;

    info!(
        refresh_attempts = stats.attempts,
        refresh_failures = stats.failures,
        last_generation = controller.generation(),
        "lineup-service shutdown complete"
    );

    Ok(())
}

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins over `logging.level`; an unparsable filter falls back to
/// `info`.
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Load the service configuration.
///
/// Reads `path` when it exists, otherwise starts from defaults. Environment
/// overrides apply either way.
fn load_config(path: &Path) -> Result<LineupConfig, ServiceError> {
    if path.exists() {
        return Ok(LineupConfig::from_file(path)?);
    }
    let mut config = LineupConfig::default();
    config.apply_env_overrides()?;
    config.validate()?;
    Ok(config)
}

/// Resolves on `Ctrl-C`.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "Failed to listen for Ctrl-C, serving until killed");
            std::future::pending::<()>().await;
        }
    }
}
