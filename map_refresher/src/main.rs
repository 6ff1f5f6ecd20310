#![warn(clippy::pedantic)]
mod error;
mod health;

use crate::error::{MainError, RefreshError};
use chrono::{DateTime, Utc};
use clap::Parser;
use parking_lot::RwLock;
use shared::cli::{ConfigOverrides, RefresherArgs};
use shared::error::InitializationError;
use shared::map::{render_map, write_document};
use shared::positions::load_fleet;
use shared::{Config, init_tracing, load_config, shutdown_listener};
use std::sync::Arc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Periodically renders the latest vehicle positions to a static map page.
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    args: RefresherArgs,
}

#[derive(Clone)]
struct RefresherState {
    config: Arc<Config>,
    last_attempted_refresh: Arc<RwLock<Option<DateTime<Utc>>>>,
    last_successful_refresh: Arc<RwLock<Option<DateTime<Utc>>>>,
    last_error: Arc<RwLock<Option<RefreshError>>>,
}

impl RefresherState {
    fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            last_attempted_refresh: Arc::new(RwLock::new(None)),
            last_successful_refresh: Arc::new(RwLock::new(None)),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum RefreshOutcome {
    Written { vehicles: usize, skipped_rows: usize },
    NoVehicles,
}

#[tokio::main]
async fn main() -> Result<(), MainError> {
    let cli = Cli::parse();
    init_tracing()?;

    let config =
        load_config(&ConfigOverrides::from(&cli.args)).map_err(InitializationError::Config)?;
    info!(name: "config.loaded", config = ?config, "config loaded");

    let output_path = std::path::absolute(&config.refresher.output_path)?;
    info!(
        name: "refresher.output",
        url = %format!("file://{}", output_path.display()),
        "map document will be written to this location"
    );

    let state = RefresherState::new(config);

    // Cancellation token shared across tasks; listener cancels on SIGINT/SIGTERM.
    let shutdown_token = CancellationToken::new();
    let mut signal_handle = tokio::spawn(shutdown_listener(Some(shutdown_token.clone())));
    let mut axum_handle = tokio::spawn(health::run_health_server(
        state.clone(),
        shutdown_token.clone(),
    ));
    let mut refresher_handle = tokio::spawn(refresher_loop(state, shutdown_token.clone()));

    let mut first_err: Option<MainError> = None;
    let mut axum_done = false;
    let mut refresher_done = false;

    tokio::select! {
        res = &mut axum_handle => {
            info!(name: "axum.completed", "axum task completed first, propagating cancellation token to other tasks");
            axum_done = true;
            shutdown_token.cancel();
            match res {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(name: "axum.completed", error = ?e, "axum task completed due to error");
                    first_err.get_or_insert(e.into());
                }
                Err(join) => {
                    warn!(name: "axum.completed", error = ?join, "axum task completed due to error");
                    first_err.get_or_insert(join.into());
                }
            }
        }
        res = &mut refresher_handle => {
            info!(name: "refresher.completed", "refresher task completed first, propagating cancellation token to other tasks");
            refresher_done = true;
            shutdown_token.cancel();
            if let Err(join) = res {
                warn!(name: "refresher.completed", error = ?join, "refresher task completed due to error");
                first_err.get_or_insert(join.into());
            }
        }
        res = &mut signal_handle => {
            info!(name: "listener.completed", "SIGINT/SIGTERM listener task completed first, propagating cancellation token to other tasks");
            shutdown_token.cancel();
            if let Err(join) = res {
                warn!(name: "listener.completed", error = ?join, "error with SIGINT/SIGTERM listener task");
                first_err.get_or_insert(join.into());
            }
        }
    }

    if !axum_done {
        info!(name: "axum.completion.awaiting", "awaiting completion of axum task");
        match axum_handle.await {
            Ok(Ok(())) => info!(name: "axum.completed", "axum task completed successfully"),
            Ok(Err(e)) => {
                info!(name: "axum.completed", error = ?e, "axum task completed with error");
                first_err.get_or_insert(e.into());
            }
            Err(join) => {
                info!(name: "axum.completed", error = ?join, "axum task completed with error");
                first_err.get_or_insert(join.into());
            }
        }
    }
    if !refresher_done {
        info!(name: "refresher.completion.awaiting", "awaiting completion of refresher task");
        if let Err(join) = refresher_handle.await {
            info!(name: "refresher.completed", error = ?join, "refresher task completed with error");
            first_err.get_or_insert(join.into());
        } else {
            info!(name: "refresher.completed", "refresher task completed successfully");
        }
    }

    if let Some(err) = first_err {
        Err(err)
    } else {
        Ok(())
    }
}

async fn refresher_loop(state: RefresherState, shutdown: CancellationToken) {
    let interval = state.config.refresher.interval();
    info!(
        name: "refresher.loop.initialized",
        interval_seconds = interval.as_secs(),
        "initialized map refresher"
    );

    let mut initial_loop = true;
    loop {
        if initial_loop {
            initial_loop = false;
        } else {
            tokio::select! {
                () = sleep(interval) => {},
                () = shutdown.cancelled() => {
                    info!(name: "refresher.shutdown.requested", "shutdown requested, exiting refresher loop");
                    break;
                }
            }
        }

        let now = Utc::now();
        *state.last_attempted_refresh.write() = Some(now);
        match refresh_once(&state.config).await {
            Ok(RefreshOutcome::Written {
                vehicles,
                skipped_rows,
            }) => {
                info!(
                    name: "refresher.map.written",
                    vehicles,
                    skipped_rows,
                    path = %state.config.refresher.output_path.display(),
                    "map updated"
                );
                *state.last_successful_refresh.write() = Some(now);
            }
            Ok(RefreshOutcome::NoVehicles) => {
                info!(name: "refresher.map.skipped", "no vehicle data to show, keeping previous map");
                *state.last_successful_refresh.write() = Some(now);
            }
            Err(e) => {
                warn!(name: "refresher.map.failed", error = ?e, "failed to refresh map");
                *state.last_error.write() = Some(e);
            }
        }

        // If shutdown was requested during the refresh, break after finishing the iteration.
        if shutdown.is_cancelled() {
            info!(name: "refresher.shutdown.requested", "shutdown requested, refresher loop exiting after current iteration");
            break;
        }
    }
}

#[instrument(skip_all)]
async fn refresh_once(config: &Config) -> Result<RefreshOutcome, RefreshError> {
    let fleet = load_fleet(config.source.csv_path.clone()).await?;
    if fleet.is_empty() {
        return Ok(RefreshOutcome::NoVehicles);
    }

    let html = render_map(&fleet, &config.map)?;
    write_document(&config.refresher.output_path, &html).await?;
    debug!(name: "refresher.document.written", bytes = html.len(), "wrote map document");

    Ok(RefreshOutcome::Written {
        vehicles: fleet.vehicles.len(),
        skipped_rows: fleet.skipped_rows,
    })
}
