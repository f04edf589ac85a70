//! Queue engine, snapshot views, and display push for the clinic queue.
//!
//! This crate owns every rule of the walk-in queue. Transports (the HTTP
//! API, the WebSocket) call into it; storage sits behind
//! [`clinicq_db::TicketStore`].
//!
//! ```text
//!   staff request ──► QueueEngine ──write guard──► TicketStore
//!                          │
//!                          └─ QueueEvent ─► PushScheduler ◄─ interval
//!                                               │
//!                             waiting_list() ◄──┘ (read guard)
//!                                               │
//!                                               ▼
//!                                          Broadcaster ──► displays
//! ```
//!
//! # Modules
//!
//! - [`engine`] -- [`QueueEngine`]: enqueue, call next, finish, mark absent.
//! - [`snapshot`] -- Waiting list, display view, clinics, and counts.
//! - [`policy`] -- Serving scope and the ticket state machine.
//! - [`broadcaster`] -- Bounded per-display fan-out.
//! - [`scheduler`] -- [`PushScheduler`]: interval and event-driven publish.
//! - [`events`] -- Queue-changed notifications.
//! - [`config`] -- Configuration loading from `clinicq-config.yaml`.
//! - [`error`] -- [`QueueError`].

pub mod broadcaster;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod policy;
pub mod scheduler;
pub mod snapshot;

pub use broadcaster::{Broadcaster, PublishReport, SubscriberId, Subscription};
pub use config::{ClinicQueueConfig, ConfigError, StoreBackend};
pub use engine::{EnqueueRequest, QueueEngine};
pub use error::{ErrorKind, QueueError};
pub use events::QueueEvent;
pub use policy::{QueuePolicy, ServingScope};
pub use scheduler::PushScheduler;
