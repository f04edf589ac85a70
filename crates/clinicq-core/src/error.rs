//! Error type returned by every queue operation.

use clinicq_db::DbError;
use clinicq_types::{TicketId, TicketState};

/// Coarse classification of a [`QueueError`], used by transports to pick a
/// status code without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller supplied unusable input.
    Validation,
    /// The addressed ticket (or any waiting ticket) does not exist.
    NotFound,
    /// The request collides with the current queue state.
    Conflict,
    /// The record store failed.
    Storage,
}

/// Errors produced by [`QueueEngine`](crate::engine::QueueEngine) operations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// A required field was empty, blank, or referenced an unknown clinic.
    #[error("validation failed: {0}")]
    Validation(String),

    /// No ticket has the given id.
    #[error("ticket {0} not found")]
    TicketNotFound(TicketId),

    /// `CallNext` found no waiting ticket.
    #[error("no waiting tickets")]
    NoWaitingTickets,

    /// The serving-scope policy or a store constraint rejected the request.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The ticket is not in a state the operation can move it from.
    #[error("ticket {id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// The addressed ticket.
        id: TicketId,
        /// Its current state.
        from: TicketState,
        /// The state the operation asked for.
        to: TicketState,
    },

    /// The record store failed; the operation did not take effect.
    #[error("storage error: {0}")]
    Storage(#[source] DbError),
}

impl QueueError {
    /// Classify the error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::TicketNotFound(_) | Self::NoWaitingTickets => ErrorKind::NotFound,
            Self::Conflict(_) | Self::InvalidTransition { .. } => ErrorKind::Conflict,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }
}

impl From<DbError> for QueueError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::TicketNotFound(id) => Self::TicketNotFound(id),
            DbError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Storage(other),
        }
    }
}
