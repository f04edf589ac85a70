//! Queue-changed notifications raised by the engine after each mutation.
//!
//! Events carry no snapshot. They only tell the push scheduler that the
//! waiting list may have changed; the scheduler reads a fresh view itself.

use clinicq_types::TicketId;

/// A committed queue mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueEvent {
    /// A ticket was issued.
    Enqueued(TicketId),
    /// A ticket was called to the desk.
    Called(TicketId),
    /// A ticket was finished (or already was).
    Finished(TicketId),
    /// A ticket was marked absent (or already was).
    MarkedAbsent(TicketId),
}

impl QueueEvent {
    /// The ticket the mutation touched.
    pub const fn ticket_id(self) -> TicketId {
        match self {
            Self::Enqueued(id) | Self::Called(id) | Self::Finished(id) | Self::MarkedAbsent(id) => {
                id
            }
        }
    }

    /// Short label for structured logging.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Enqueued(_) => "enqueued",
            Self::Called(_) => "called",
            Self::Finished(_) => "finished",
            Self::MarkedAbsent(_) => "marked_absent",
        }
    }
}
