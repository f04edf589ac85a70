//! Data layer for the clinic queue.
//!
//! The queue engine talks to durable storage only through the
//! [`TicketStore`] trait. Two backends implement it:
//!
//! ```text
//! QueueEngine
//!     |
//!     +-- TicketStore --+-- MemoryStore    (process-local, tests, demos)
//!                       +-- PostgresStore  (tickets + clinics tables)
//! ```
//!
//! # Modules
//!
//! - [`store`] -- The `TicketStore` contract and the `Store` backend enum
//! - [`memory`] -- In-process backend
//! - [`postgres`] -- `PostgreSQL` connection pool and backend
//! - [`error`] -- Shared error types

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

// Re-export primary types for convenience.
pub use error::DbError;
pub use memory::MemoryStore;
pub use postgres::{ClinicRow, PostgresConfig, PostgresStore, TicketRow};
pub use store::{NewClinic, Store, TicketStore};
