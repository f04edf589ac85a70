//! Axum router construction for the queue API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled so the display and reception frontends
//! can be served from another origin.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the queue server.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /health` -- liveness
/// - `GET /ws/queue` -- `WebSocket` `queue_update` stream
/// - `GET /api/clinics` -- clinics
/// - `GET /api/display` -- current ticket and next two
/// - `GET|POST /api/tickets` -- waiting list / issue ticket
/// - `GET /api/tickets/{id}` -- single ticket
/// - `POST /api/tickets/call` -- call next
/// - `POST /api/tickets/{id}/finish` -- finish
/// - `POST /api/tickets/{id}/absent` -- mark absent
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        // WebSocket
        .route("/ws/queue", get(ws::ws_queue))
        // Public reads
        .route("/api/clinics", get(handlers::list_clinics))
        .route("/api/display", get(handlers::display))
        // Staff
        .route(
            "/api/tickets",
            get(handlers::list_waiting).post(handlers::create_ticket),
        )
        .route("/api/tickets/call", post(handlers::call_next))
        .route("/api/tickets/{id}", get(handlers::get_ticket))
        .route("/api/tickets/{id}/finish", post(handlers::finish_ticket))
        .route("/api/tickets/{id}/absent", post(handlers::mark_absent))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
