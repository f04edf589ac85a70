//! Queue rules: who may be called next and which state changes are legal.
//!
//! Everything here is pure. The engine loads tickets under its write guard
//! and asks this module what to do with them.

use std::collections::BTreeSet;

use clinicq_types::{ClinicId, Ticket, TicketState};
use serde::Deserialize;

use crate::error::QueueError;

/// How many tickets may be `Serving` at the same time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServingScope {
    /// No limit: `CallNext` always takes the oldest waiting ticket.
    #[default]
    Unbounded,
    /// At most one serving ticket per clinic.
    PerClinic,
    /// At most one serving ticket across the whole queue.
    Global,
}

impl ServingScope {
    /// Config-file spelling of the scope.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unbounded => "unbounded",
            Self::PerClinic => "per_clinic",
            Self::Global => "global",
        }
    }
}

/// Tunable queue rules, loaded from the `queue` config section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct QueuePolicy {
    /// Serving concurrency limit enforced by `CallNext`.
    #[serde(default)]
    pub serving_scope: ServingScope,

    /// Whether `MarkAbsent` may be applied to a ticket being served.
    #[serde(default = "default_true")]
    pub allow_absent_while_serving: bool,
}

impl Default for QueuePolicy {
    fn default() -> Self {
        Self {
            serving_scope: ServingScope::default(),
            allow_absent_while_serving: true,
        }
    }
}

const fn default_true() -> bool {
    true
}

/// Outcome of checking a requested state change against the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The change is legal and must be written.
    Apply,
    /// The ticket is already in the target state; nothing to write.
    Unchanged,
    /// The change is not allowed from the current state.
    Reject,
}

impl QueuePolicy {
    /// Decide whether a ticket in `from` may move to `to`.
    pub const fn check(self, from: TicketState, to: TicketState) -> Transition {
        if from.is_terminal() {
            // A terminal ticket only accepts a repeat of the call that closed it.
            return match (from, to) {
                (TicketState::Finished, TicketState::Finished)
                | (TicketState::Absent, TicketState::Absent) => Transition::Unchanged,
                _ => Transition::Reject,
            };
        }
        match (from, to) {
            (TicketState::Waiting, TicketState::Serving | TicketState::Absent)
            | (TicketState::Serving, TicketState::Finished) => Transition::Apply,
            (TicketState::Serving, TicketState::Absent) => {
                if self.allow_absent_while_serving {
                    Transition::Apply
                } else {
                    Transition::Reject
                }
            }
            _ => Transition::Reject,
        }
    }

    /// Pick the ticket `CallNext` should move to `Serving`.
    ///
    /// `waiting` must already be in FIFO order; `serving` is every ticket
    /// currently being served.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::NoWaitingTickets`] if `waiting` is empty and
    /// [`QueueError::Conflict`] if the serving scope blocks every candidate.
    pub fn select_next(
        self,
        waiting: Vec<Ticket>,
        serving: &[Ticket],
    ) -> Result<Ticket, QueueError> {
        if waiting.is_empty() {
            return Err(QueueError::NoWaitingTickets);
        }
        match self.serving_scope {
            ServingScope::Unbounded => waiting
                .into_iter()
                .next()
                .ok_or(QueueError::NoWaitingTickets),
            ServingScope::Global => match serving.first() {
                Some(busy) => Err(QueueError::Conflict(format!(
                    "ticket {} is still being served",
                    busy.ticket_number
                ))),
                None => waiting
                    .into_iter()
                    .next()
                    .ok_or(QueueError::NoWaitingTickets),
            },
            ServingScope::PerClinic => {
                let busy: BTreeSet<ClinicId> = serving.iter().map(|t| t.clinic_id).collect();
                waiting
                    .into_iter()
                    .find(|t| !busy.contains(&t.clinic_id))
                    .ok_or_else(|| {
                        QueueError::Conflict(String::from(
                            "every clinic with waiting patients is already serving one",
                        ))
                    })
            }
        }
    }
}

/// Sort tickets into FIFO order: `(createdAt, id)` ascending.
pub fn sort_fifo(tickets: &mut [Ticket]) {
    tickets.sort_by_key(Ticket::fifo_key);
}
