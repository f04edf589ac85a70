//! Server startup helper for the queue binary.
//!
//! Provides [`spawn_api`] which binds the listener eagerly (so a port
//! conflict fails startup instead of a background task) and then serves
//! on a background Tokio task.

use std::sync::Arc;

use clinicq_core::config::ServerConfig;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::server::{ServerError, bind, serve};
use crate::state::AppState;

/// Errors that can occur when spawning the API server.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind or start.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// Bind `config`'s address and serve the API on a background task.
///
/// The task finishes after `shutdown` turns `true` and in-flight requests
/// drain. Serve errors inside the task are logged.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the address cannot be bound.
pub async fn spawn_api(
    config: &ServerConfig,
    state: Arc<AppState>,
    shutdown: watch::Receiver<bool>,
) -> Result<JoinHandle<()>, StartupError> {
    let listener = bind(config).await?;

    let handle = tokio::spawn(async move {
        if let Err(e) = serve(listener, state, shutdown).await {
            tracing::error!(error = %e, "Queue server exited with error");
        }
    });

    tracing::info!(
        host = %config.host,
        port = config.port,
        "Queue server spawned on background task"
    );

    Ok(handle)
}
