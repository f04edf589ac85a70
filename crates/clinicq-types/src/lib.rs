//! Shared type definitions for the clinic walk-in queue.
//!
//! This crate is the single source of truth for the records and payloads
//! that cross crate boundaries. Wire types flow downstream to `TypeScript`
//! via `ts-rs` for the waiting-room display.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe wrappers for store-assigned keys
//! - [`enums`] -- Ticket lifecycle state
//! - [`structs`] -- Tickets, clinics, views, and the broadcast payload

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::TicketState;
pub use ids::{ClinicId, TicketId};
pub use structs::{
    BroadcastMessage, Clinic, DEFAULT_CLINIC_COLOR, DisplayBoard, DisplaySlot, DisplayView,
    NewTicket, QueueCounts, QueueEntry, Ticket, TicketNumber,
};
