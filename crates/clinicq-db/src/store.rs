//! The durable record contract the queue engine is written against.
//!
//! [`TicketStore`] is deliberately narrow: count, insert, update state,
//! fetch, and list by state, plus read access to clinics. It does not
//! serialize writers by itself; the engine holds the single critical
//! section around numbering and FIFO selection. Backends only need to make
//! each individual call atomic, and the `PostgreSQL` backend additionally
//! rejects duplicate ticket numbers with [`DbError::Conflict`].
//!
//! Async methods return `impl Future + Send` so the engine can run inside
//! spawned Tokio tasks. Runtime backend selection goes through the
//! [`Store`] enum instead of trait objects, since async trait methods are
//! not dyn-compatible.

use std::future::Future;

use clinicq_types::{Clinic, ClinicId, NewTicket, Ticket, TicketId, TicketState};

use crate::error::DbError;
use crate::memory::MemoryStore;
use crate::postgres::PostgresStore;

/// A clinic as handed to the store for insertion (seed data).
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct NewClinic {
    /// Display name.
    pub name: String,
    /// Optional longer description.
    #[serde(default)]
    pub description: Option<String>,
    /// Display color; the store default applies when absent.
    #[serde(default)]
    pub color: Option<String>,
}

impl NewClinic {
    /// Convenience constructor with no description or color.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            description: None,
            color: None,
        }
    }
}

/// Durable record keeper for tickets and clinics.
pub trait TicketStore: Send + Sync {
    /// Total number of tickets ever inserted, in any state.
    fn count_tickets(&self) -> impl Future<Output = Result<u64, DbError>> + Send;

    /// Insert a ticket and return the id the store assigned to it.
    ///
    /// Ids are strictly increasing in insertion order.
    fn insert_ticket(
        &self,
        ticket: &NewTicket,
    ) -> impl Future<Output = Result<TicketId, DbError>> + Send;

    /// Overwrite the state of one ticket.
    ///
    /// Returns [`DbError::TicketNotFound`] if no ticket has this id.
    fn update_state(
        &self,
        id: TicketId,
        state: TicketState,
    ) -> impl Future<Output = Result<(), DbError>> + Send;

    /// Fetch one ticket by id.
    fn get_ticket(
        &self,
        id: TicketId,
    ) -> impl Future<Output = Result<Option<Ticket>, DbError>> + Send;

    /// All tickets currently in `state`. Order is unspecified.
    fn list_by_state(
        &self,
        state: TicketState,
    ) -> impl Future<Output = Result<Vec<Ticket>, DbError>> + Send;

    /// All clinics, ordered by id.
    fn list_clinics(&self) -> impl Future<Output = Result<Vec<Clinic>, DbError>> + Send;

    /// Fetch one clinic by id.
    fn get_clinic(
        &self,
        id: ClinicId,
    ) -> impl Future<Output = Result<Option<Clinic>, DbError>> + Send;

    /// Insert a clinic and return its id.
    fn insert_clinic(
        &self,
        clinic: &NewClinic,
    ) -> impl Future<Output = Result<ClinicId, DbError>> + Send;
}

// ---------------------------------------------------------------------------
// Runtime-selected backend
// ---------------------------------------------------------------------------

/// A [`TicketStore`] backend chosen at startup from configuration.
///
/// Uses enum dispatch so the engine stays generic over one concrete type.
pub enum Store {
    /// Process-local tables; contents are lost on restart.
    Memory(MemoryStore),
    /// `PostgreSQL`-backed tables.
    Postgres(PostgresStore),
}

impl Store {
    /// Human-readable backend name for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Postgres(_) => "postgres",
        }
    }
}

impl TicketStore for Store {
    async fn count_tickets(&self) -> Result<u64, DbError> {
        match self {
            Self::Memory(s) => s.count_tickets().await,
            Self::Postgres(s) => s.count_tickets().await,
        }
    }

    async fn insert_ticket(&self, ticket: &NewTicket) -> Result<TicketId, DbError> {
        match self {
            Self::Memory(s) => s.insert_ticket(ticket).await,
            Self::Postgres(s) => s.insert_ticket(ticket).await,
        }
    }

    async fn update_state(&self, id: TicketId, state: TicketState) -> Result<(), DbError> {
        match self {
            Self::Memory(s) => s.update_state(id, state).await,
            Self::Postgres(s) => s.update_state(id, state).await,
        }
    }

    async fn get_ticket(&self, id: TicketId) -> Result<Option<Ticket>, DbError> {
        match self {
            Self::Memory(s) => s.get_ticket(id).await,
            Self::Postgres(s) => s.get_ticket(id).await,
        }
    }

    async fn list_by_state(&self, state: TicketState) -> Result<Vec<Ticket>, DbError> {
        match self {
            Self::Memory(s) => s.list_by_state(state).await,
            Self::Postgres(s) => s.list_by_state(state).await,
        }
    }

    async fn list_clinics(&self) -> Result<Vec<Clinic>, DbError> {
        match self {
            Self::Memory(s) => s.list_clinics().await,
            Self::Postgres(s) => s.list_clinics().await,
        }
    }

    async fn get_clinic(&self, id: ClinicId) -> Result<Option<Clinic>, DbError> {
        match self {
            Self::Memory(s) => s.get_clinic(id).await,
            Self::Postgres(s) => s.get_clinic(id).await,
        }
    }

    async fn insert_clinic(&self, clinic: &NewClinic) -> Result<ClinicId, DbError> {
        match self {
            Self::Memory(s) => s.insert_clinic(clinic).await,
            Self::Postgres(s) => s.insert_clinic(clinic).await,
        }
    }
}
