//! Shared application state for the queue API server.
//!
//! [`AppState`] carries the single [`QueueEngine`] and [`Broadcaster`]
//! constructed at startup, plus the [`AuthGate`] guarding staff routes.
//! Handlers never build their own notification machinery; they only
//! call the engine, and the push scheduler takes it from there.

use std::sync::Arc;

use clinicq_core::{Broadcaster, QueueEngine};
use clinicq_db::Store;

use crate::auth::AuthGate;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
pub struct AppState {
    /// The queue engine (owns the store).
    pub engine: Arc<QueueEngine<Store>>,
    /// Display fan-out used by the `WebSocket` endpoint.
    pub broadcaster: Arc<Broadcaster>,
    /// Authorization for staff routes.
    pub auth: AuthGate,
}

impl AppState {
    /// Assemble the state from already-constructed components.
    pub const fn new(
        engine: Arc<QueueEngine<Store>>,
        broadcaster: Arc<Broadcaster>,
        auth: AuthGate,
    ) -> Self {
        Self {
            engine,
            broadcaster,
            auth,
        }
    }
}
