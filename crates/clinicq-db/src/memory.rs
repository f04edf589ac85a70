//! In-process [`TicketStore`] backend.
//!
//! Holds tickets and clinics in [`BTreeMap`]s behind a Tokio [`RwLock`].
//! Every call takes the lock once, so each individual operation is atomic.
//! Used by tests and by deployments that do not configure `PostgreSQL`.

use std::collections::BTreeMap;

use clinicq_types::{
    Clinic, ClinicId, DEFAULT_CLINIC_COLOR, NewTicket, Ticket, TicketId, TicketState,
};
use tokio::sync::RwLock;

use crate::error::DbError;
use crate::store::{NewClinic, TicketStore};

#[derive(Debug, Default)]
struct Tables {
    tickets: BTreeMap<TicketId, Ticket>,
    clinics: BTreeMap<ClinicId, Clinic>,
    last_ticket_id: i64,
    last_clinic_id: i64,
}

/// Process-local ticket and clinic tables.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with the given clinics (ids 1..=n).
    pub fn with_clinics(clinics: &[NewClinic]) -> Self {
        let mut tables = Tables::default();
        for clinic in clinics {
            insert_clinic_row(&mut tables, clinic);
        }
        Self {
            tables: RwLock::new(tables),
        }
    }
}

fn insert_clinic_row(tables: &mut Tables, clinic: &NewClinic) -> ClinicId {
    tables.last_clinic_id = tables.last_clinic_id.saturating_add(1);
    let id = ClinicId::new(tables.last_clinic_id);
    tables.clinics.insert(
        id,
        Clinic {
            id,
            name: clinic.name.clone(),
            description: clinic.description.clone(),
            color: clinic
                .color
                .clone()
                .unwrap_or_else(|| DEFAULT_CLINIC_COLOR.to_owned()),
        },
    );
    id
}

impl TicketStore for MemoryStore {
    async fn count_tickets(&self) -> Result<u64, DbError> {
        let tables = self.tables.read().await;
        Ok(u64::try_from(tables.tickets.len()).unwrap_or(u64::MAX))
    }

    async fn insert_ticket(&self, ticket: &NewTicket) -> Result<TicketId, DbError> {
        let mut tables = self.tables.write().await;
        if tables
            .tickets
            .values()
            .any(|t| t.ticket_number == ticket.ticket_number)
        {
            return Err(DbError::Conflict(format!(
                "ticket number {} already issued",
                ticket.ticket_number
            )));
        }
        tables.last_ticket_id = tables.last_ticket_id.saturating_add(1);
        let id = TicketId::new(tables.last_ticket_id);
        tables.tickets.insert(id, ticket.clone().with_id(id));
        Ok(id)
    }

    async fn update_state(&self, id: TicketId, state: TicketState) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        let ticket = tables
            .tickets
            .get_mut(&id)
            .ok_or(DbError::TicketNotFound(id))?;
        ticket.state = state;
        Ok(())
    }

    async fn get_ticket(&self, id: TicketId) -> Result<Option<Ticket>, DbError> {
        let tables = self.tables.read().await;
        Ok(tables.tickets.get(&id).cloned())
    }

    async fn list_by_state(&self, state: TicketState) -> Result<Vec<Ticket>, DbError> {
        let tables = self.tables.read().await;
        Ok(tables
            .tickets
            .values()
            .filter(|t| t.state == state)
            .cloned()
            .collect())
    }

    async fn list_clinics(&self) -> Result<Vec<Clinic>, DbError> {
        let tables = self.tables.read().await;
        Ok(tables.clinics.values().cloned().collect())
    }

    async fn get_clinic(&self, id: ClinicId) -> Result<Option<Clinic>, DbError> {
        let tables = self.tables.read().await;
        Ok(tables.clinics.get(&id).cloned())
    }

    async fn insert_clinic(&self, clinic: &NewClinic) -> Result<ClinicId, DbError> {
        let mut tables = self.tables.write().await;
        Ok(insert_clinic_row(&mut tables, clinic))
    }
}
