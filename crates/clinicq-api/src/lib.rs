//! HTTP and `WebSocket` API for the clinic ticket queue.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **Staff REST endpoints** for issuing, calling, finishing, and
//!   marking tickets absent, guarded by an [`AuthGate`]
//! - **Display endpoints** (`/api/display`, `/api/clinics`) for the
//!   waiting-room screen
//! - **`WebSocket` endpoint** (`/ws/queue`) streaming `queue_update`
//!   messages from the shared [`Broadcaster`](clinicq_core::Broadcaster)
//! - **Minimal HTML status page** (`GET /`) with queue totals
//!
//! # Architecture
//!
//! Handlers hold no queue logic. Each one calls a single
//! [`QueueEngine`](clinicq_core::QueueEngine) operation and maps
//! [`QueueError`](clinicq_core::QueueError) to a status code through
//! [`ApiError`]. Pushes to displays are driven by the push scheduler
//! running beside the server, not by the handlers.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use auth::{AuthGate, StaffAccess};
pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerError, bind, serve};
pub use startup::{StartupError, spawn_api};
pub use state::AppState;
