//! Enumeration types for the clinic queue.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Ticket state
// ---------------------------------------------------------------------------

/// Lifecycle state of a ticket.
///
/// ```text
/// Waiting --call--> Serving --finish--> Finished
///    |                 |
///    +---absent--------+--absent------> Absent
/// ```
///
/// `Finished` and `Absent` are terminal. No transition leads back to
/// `Waiting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum TicketState {
    /// Issued and waiting to be called.
    Waiting,
    /// Called by staff and currently being attended.
    Serving,
    /// Attended to completion.
    Finished,
    /// Patient did not show up (or left mid-call).
    Absent,
}

impl TicketState {
    /// All states in lifecycle order.
    pub const ALL: [Self; 4] = [Self::Waiting, Self::Serving, Self::Finished, Self::Absent];

    /// Whether no further transition is possible from this state.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Absent)
    }

    /// Stable lowercase name used in storage and on the wire.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Serving => "serving",
            Self::Finished => "finished",
            Self::Absent => "absent",
        }
    }

    /// Parse the stable lowercase name back into a state.
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == raw)
    }
}

impl core::fmt::Display for TicketState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
