//! Clinic queue server binary.
//!
//! Wires the record store, queue engine, display broadcaster, push
//! scheduler, and HTTP API together, then runs until Ctrl-C.
//!
//! Configuration is read from `clinicq-config.yaml` in the working
//! directory (or the path in `CLINICQ_CONFIG`), then overridden by
//! `DATABASE_URL`, `CLINICQ_PORT`, and `CLINICQ_API_TOKEN`.

mod bootstrap;
mod error;

use std::path::PathBuf;
use std::sync::Arc;

use clinicq_api::{AppState, AuthGate, spawn_api};
use clinicq_core::{Broadcaster, ClinicQueueConfig, PushScheduler, QueueEngine};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::ServerError;

const DEFAULT_CONFIG_PATH: &str = "clinicq-config.yaml";

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    // 1. Load configuration. Logging is not up yet, so this happens first
    //    and its outcome is reported right after.
    let config_path = config_path();
    let mut config = ClinicQueueConfig::load_or_default(&config_path)?;
    config.apply_env_overrides()?;

    // 2. Initialize structured logging. RUST_LOG wins over the config level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!(
        config = %config_path.display(),
        found = config_path.exists(),
        "clinicq-server starting"
    );

    // 3. Open the record store and seed clinics on first run.
    let (store, pool) = bootstrap::open_store(&config.store).await?;
    let seeded = bootstrap::seed_clinics(&store, &config.clinics).await?;
    info!(backend = store.name(), seeded, "Record store ready");

    // 4. Queue engine, with an event channel into the push scheduler.
    let (event_tx, event_rx) = mpsc::channel(config.push.event_buffer.max(1));
    let engine = Arc::new(QueueEngine::new(store, config.queue).with_events(event_tx));
    let broadcaster = Arc::new(Broadcaster::new(config.push.subscriber_buffer));

    let policy = engine.policy();
    info!(
        serving_scope = policy.serving_scope.as_str(),
        allow_absent_while_serving = policy.allow_absent_while_serving,
        "Queue engine initialized"
    );

    // 5. Push scheduler on its own task.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = PushScheduler::new(
        Arc::clone(&engine),
        Arc::clone(&broadcaster),
        config.push.interval(),
    )
    .spawn(event_rx, shutdown_rx.clone());

    // 6. HTTP API.
    let auth = AuthGate::from_token(config.auth.token.clone());
    info!(mode = auth.mode(), "Staff route authorization configured");
    let state = Arc::new(AppState::new(engine, broadcaster, auth));
    let api = spawn_api(&config.server, state, shutdown_rx).await?;

    // 7. Run until Ctrl-C, then stop everything in order.
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    if shutdown_tx.send(true).is_err() {
        warn!("All shutdown receivers already gone");
    }

    if let Err(e) = api.await {
        warn!(error = %e, "API task did not finish cleanly");
    }
    if let Err(e) = scheduler.await {
        warn!(error = %e, "Push scheduler task did not finish cleanly");
    }
    if let Some(pool) = pool {
        pool.close().await;
    }

    info!("clinicq-server shutdown complete");
    Ok(())
}

/// Config file location: `CLINICQ_CONFIG` if set, else the default name.
fn config_path() -> PathBuf {
    std::env::var_os("CLINICQ_CONFIG")
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}
