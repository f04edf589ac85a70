//! Core entity structs for the clinic queue.
//!
//! Covers tickets, clinics, the joined waiting-list entry pushed to
//! displays, and the display/broadcast payloads. All wire types use
//! camelCase field names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::TicketState;
use crate::ids::{ClinicId, TicketId};

/// Display color used when a clinic has none configured.
pub const DEFAULT_CLINIC_COLOR: &str = "#007bff";

// ---------------------------------------------------------------------------
// Ticket number
// ---------------------------------------------------------------------------

/// Human-facing ticket label, `T-` followed by the 1-based issuance count
/// zero-padded to three digits (`T-001`, `T-042`, `T-1000`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export, export_to = "bindings/")]
pub struct TicketNumber(String);

impl TicketNumber {
    /// Format the label for the `sequence`-th ticket ever issued.
    pub fn from_sequence(sequence: u64) -> Self {
        Self(format!("T-{sequence:03}"))
    }

    /// Wrap a label read back from storage.
    pub const fn from_stored(raw: String) -> Self {
        Self(raw)
    }

    /// Borrow the label text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Recover the issuance sequence from a well-formed label.
    pub fn sequence(&self) -> Option<u64> {
        self.0.strip_prefix("T-")?.parse().ok()
    }
}

impl core::fmt::Display for TicketNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Ticket
// ---------------------------------------------------------------------------

/// One patient's position in the walk-in queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Ticket {
    /// Store-assigned key (ascending in insertion order).
    pub id: TicketId,
    /// Patient display name.
    pub patient_name: String,
    /// Patient identification document number.
    pub patient_identification: String,
    /// Optional contact phone.
    pub patient_phone: Option<String>,
    /// Clinic the patient is queued for.
    pub clinic_id: ClinicId,
    /// Issued label, unique and never reused.
    pub ticket_number: TicketNumber,
    /// Current lifecycle state.
    pub state: TicketState,
    /// Issuance timestamp. Never changes.
    pub created_at: DateTime<Utc>,
}

impl Ticket {
    /// FIFO ordering key: creation time, then insertion order.
    pub const fn fifo_key(&self) -> (DateTime<Utc>, TicketId) {
        (self.created_at, self.id)
    }
}

/// A ticket as handed to the store for insertion, before it has an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTicket {
    /// Patient display name.
    pub patient_name: String,
    /// Patient identification document number.
    pub patient_identification: String,
    /// Optional contact phone.
    pub patient_phone: Option<String>,
    /// Clinic the patient is queued for.
    pub clinic_id: ClinicId,
    /// Label assigned by the engine.
    pub ticket_number: TicketNumber,
    /// Initial state (always `Waiting` when issued by the engine).
    pub state: TicketState,
    /// Issuance timestamp.
    pub created_at: DateTime<Utc>,
}

impl NewTicket {
    /// Attach the store-assigned id, producing the full record.
    pub fn with_id(self, id: TicketId) -> Ticket {
        Ticket {
            id,
            patient_name: self.patient_name,
            patient_identification: self.patient_identification,
            patient_phone: self.patient_phone,
            clinic_id: self.clinic_id,
            ticket_number: self.ticket_number,
            state: self.state,
            created_at: self.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Clinic
// ---------------------------------------------------------------------------

/// A service point patients queue for. Read-only from the queue's view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Clinic {
    /// Store-assigned key.
    pub id: ClinicId,
    /// Display name.
    pub name: String,
    /// Optional longer description.
    pub description: Option<String>,
    /// Display color hint (CSS color).
    pub color: String,
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// A waiting ticket joined with its clinic's display attributes.
///
/// This is the element type of the `queue` array pushed to displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct QueueEntry {
    /// Ticket key.
    pub id: TicketId,
    /// Issued label.
    pub ticket_number: TicketNumber,
    /// Ticket state (always `waiting` in a waiting list).
    pub state: TicketState,
    /// Issuance timestamp.
    pub created_at: DateTime<Utc>,
    /// Patient display name.
    pub patient_name: String,
    /// Patient identification document number.
    pub patient_identification: String,
    /// Name of the clinic the ticket is queued for.
    pub clinic_name: String,
    /// Display color of that clinic.
    pub clinic_color: String,
}

impl QueueEntry {
    /// Join a ticket with its clinic. A missing clinic yields an empty name
    /// and the default color so the ticket is never hidden from displays.
    pub fn join(ticket: &Ticket, clinic: Option<&Clinic>) -> Self {
        Self {
            id: ticket.id,
            ticket_number: ticket.ticket_number.clone(),
            state: ticket.state,
            created_at: ticket.created_at,
            patient_name: ticket.patient_name.clone(),
            patient_identification: ticket.patient_identification.clone(),
            clinic_name: clinic.map(|c| c.name.clone()).unwrap_or_default(),
            clinic_color: clinic.map_or_else(
                || DEFAULT_CLINIC_COLOR.to_owned(),
                |c| c.color.clone(),
            ),
        }
    }
}

/// What the waiting-room screen shows: who is being attended and who is next.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct DisplayView {
    /// Oldest ticket currently being served, if any.
    pub current: Option<Ticket>,
    /// The next (at most two) waiting tickets in FIFO order.
    pub up_next: Vec<Ticket>,
}

/// One line of the public waiting-room board.
///
/// Carries only what a screen in the waiting room may show; the
/// identification document and phone stay on the staff side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct DisplaySlot {
    /// Issued label.
    pub ticket_number: TicketNumber,
    /// Patient display name.
    pub patient_name: String,
    /// Clinic the patient is queued for.
    pub clinic_id: ClinicId,
}

impl From<&Ticket> for DisplaySlot {
    fn from(ticket: &Ticket) -> Self {
        Self {
            ticket_number: ticket.ticket_number.clone(),
            patient_name: ticket.patient_name.clone(),
            clinic_id: ticket.clinic_id,
        }
    }
}

/// Public projection of a [`DisplayView`], served on `/api/display`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct DisplayBoard {
    /// Patient being attended, if any.
    pub current: Option<DisplaySlot>,
    /// The next (at most two) patients.
    pub up_next: Vec<DisplaySlot>,
}

impl From<&DisplayView> for DisplayBoard {
    fn from(view: &DisplayView) -> Self {
        Self {
            current: view.current.as_ref().map(DisplaySlot::from),
            up_next: view.up_next.iter().map(DisplaySlot::from).collect(),
        }
    }
}

/// Ticket totals per state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct QueueCounts {
    /// Tickets in `waiting`.
    pub waiting: u64,
    /// Tickets in `serving`.
    pub serving: u64,
    /// Tickets in `finished`.
    pub finished: u64,
    /// Tickets in `absent`.
    pub absent: u64,
}

impl QueueCounts {
    /// Total tickets ever issued.
    pub const fn total(&self) -> u64 {
        self.waiting
            .saturating_add(self.serving)
            .saturating_add(self.finished)
            .saturating_add(self.absent)
    }
}

// ---------------------------------------------------------------------------
// Broadcast payload
// ---------------------------------------------------------------------------

/// Tagged message pushed to every connected display.
///
/// Serializes as `{"type": "queue_update", "queue": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum BroadcastMessage {
    /// Full waiting list at the moment the snapshot was taken.
    QueueUpdate {
        /// Waiting tickets in FIFO order.
        queue: Vec<QueueEntry>,
    },
}

impl BroadcastMessage {
    /// Borrow the waiting list carried by the message.
    pub fn queue(&self) -> &[QueueEntry] {
        match self {
            Self::QueueUpdate { queue } => queue,
        }
    }
}
