//! Read-only views over the queue.
//!
//! Each view takes the engine's read guard once and builds its whole
//! result under it, so a view is always consistent with the last committed
//! mutation and never mixes before/after states.

use std::collections::BTreeMap;

use clinicq_db::TicketStore;
use clinicq_types::{Clinic, ClinicId, DisplayView, QueueCounts, QueueEntry, TicketState};

use crate::engine::QueueEngine;
use crate::error::QueueError;
use crate::policy::sort_fifo;

/// Number of waiting tickets shown under "next" on the display.
pub const UP_NEXT_LEN: usize = 2;

impl<S: TicketStore> QueueEngine<S> {
    /// Every waiting ticket joined with its clinic, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Storage`] if the store fails.
    pub async fn waiting_list(&self) -> Result<Vec<QueueEntry>, QueueError> {
        let store = self.store.read().await;
        let mut waiting = store.list_by_state(TicketState::Waiting).await?;
        sort_fifo(&mut waiting);
        let clinics: BTreeMap<ClinicId, Clinic> = store
            .list_clinics()
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();
        drop(store);

        Ok(waiting
            .iter()
            .map(|t| QueueEntry::join(t, clinics.get(&t.clinic_id)))
            .collect())
    }

    /// The ticket being served (oldest first if several) and the next
    /// waiting tickets.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Storage`] if the store fails.
    pub async fn display_view(&self) -> Result<DisplayView, QueueError> {
        let store = self.store.read().await;
        let mut serving = store.list_by_state(TicketState::Serving).await?;
        let mut waiting = store.list_by_state(TicketState::Waiting).await?;
        drop(store);

        sort_fifo(&mut serving);
        sort_fifo(&mut waiting);
        waiting.truncate(UP_NEXT_LEN);
        Ok(DisplayView {
            current: serving.into_iter().next(),
            up_next: waiting,
        })
    }

    /// All clinics, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Storage`] if the store fails.
    pub async fn clinics(&self) -> Result<Vec<Clinic>, QueueError> {
        let store = self.store.read().await;
        Ok(store.list_clinics().await?)
    }

    /// Ticket totals per state.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Storage`] if the store fails.
    pub async fn counts(&self) -> Result<QueueCounts, QueueError> {
        let store = self.store.read().await;
        let mut counts = QueueCounts::default();
        for state in TicketState::ALL {
            let n = u64::try_from(store.list_by_state(state).await?.len()).unwrap_or(u64::MAX);
            match state {
                TicketState::Waiting => counts.waiting = n,
                TicketState::Serving => counts.serving = n,
                TicketState::Finished => counts.finished = n,
                TicketState::Absent => counts.absent = n,
            }
        }
        Ok(counts)
    }
}
