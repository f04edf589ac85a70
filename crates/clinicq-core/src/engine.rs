//! The queue engine: issue tickets, call the next patient, close tickets.
//!
//! [`QueueEngine`] owns the [`TicketStore`] behind a Tokio [`RwLock`].
//! Every mutation holds the write guard across its reads and its single
//! store write, which is what makes `count + 1` numbering gap-free and
//! lets concurrent `CallNext` calls never hand out the same ticket. Views
//! (see [`crate::snapshot`]) take the read guard and so never observe a
//! half-applied mutation.
//!
//! After each committed mutation the engine raises a [`QueueEvent`] on a
//! bounded channel. The send is non-blocking: if the channel is full a
//! publish is already pending and the event is redundant.

use chrono::Utc;
use clinicq_db::TicketStore;
use clinicq_types::{ClinicId, NewTicket, Ticket, TicketId, TicketNumber, TicketState};
use serde::Deserialize;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};

use crate::error::QueueError;
use crate::events::QueueEvent;
use crate::policy::{QueuePolicy, Transition, sort_fifo};

/// Patient details submitted at the reception desk.
///
/// Missing string fields deserialize as empty so they are rejected by
/// validation rather than by the JSON extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnqueueRequest {
    /// Patient display name. Required.
    pub patient_name: String,
    /// Patient identification document number. Required.
    pub patient_identification: String,
    /// Optional contact phone. Blank is treated as absent.
    pub patient_phone: Option<String>,
    /// Clinic to queue for. Required and must exist.
    pub clinic_id: Option<ClinicId>,
}

impl EnqueueRequest {
    /// Build a request for `clinic_id` with no phone number.
    pub fn new(patient_name: &str, patient_identification: &str, clinic_id: ClinicId) -> Self {
        Self {
            patient_name: patient_name.to_owned(),
            patient_identification: patient_identification.to_owned(),
            patient_phone: None,
            clinic_id: Some(clinic_id),
        }
    }

    /// Attach a contact phone.
    #[must_use]
    pub fn with_phone(mut self, phone: &str) -> Self {
        self.patient_phone = Some(phone.to_owned());
        self
    }

    /// Trim every field and reject blanks.
    fn validated(self) -> Result<ValidRequest, QueueError> {
        let patient_name = required("patientName", &self.patient_name)?;
        let patient_identification =
            required("patientIdentification", &self.patient_identification)?;
        let clinic_id = self
            .clinic_id
            .ok_or_else(|| QueueError::Validation(String::from("clinicId is required")))?;
        let patient_phone = self
            .patient_phone
            .map(|p| p.trim().to_owned())
            .filter(|p| !p.is_empty());
        Ok(ValidRequest {
            patient_name,
            patient_identification,
            patient_phone,
            clinic_id,
        })
    }
}

struct ValidRequest {
    patient_name: String,
    patient_identification: String,
    patient_phone: Option<String>,
    clinic_id: ClinicId,
}

fn required(field: &str, value: &str) -> Result<String, QueueError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(QueueError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_owned())
}

/// Serialized owner of the ticket queue.
pub struct QueueEngine<S> {
    pub(crate) store: RwLock<S>,
    policy: QueuePolicy,
    events: Option<mpsc::Sender<QueueEvent>>,
}

impl<S: TicketStore> QueueEngine<S> {
    /// Wrap a store with the given policy. No events are raised until
    /// [`with_events`](Self::with_events) attaches a channel.
    pub fn new(store: S, policy: QueuePolicy) -> Self {
        Self {
            store: RwLock::new(store),
            policy,
            events: None,
        }
    }

    /// Raise a [`QueueEvent`] on `sender` after every committed mutation.
    #[must_use]
    pub fn with_events(mut self, sender: mpsc::Sender<QueueEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// The policy this engine enforces.
    pub const fn policy(&self) -> &QueuePolicy {
        &self.policy
    }

    /// Issue a new `Waiting` ticket numbered `T-{count + 1}`.
    ///
    /// # Errors
    ///
    /// [`QueueError::Validation`] for blank fields or an unknown clinic,
    /// [`QueueError::Conflict`] if the store already holds the number, and
    /// [`QueueError::Storage`] if the store fails.
    pub async fn enqueue(&self, request: EnqueueRequest) -> Result<Ticket, QueueError> {
        let request = request.validated()?;

        let ticket = {
            let store = self.store.write().await;
            if store.get_clinic(request.clinic_id).await?.is_none() {
                return Err(QueueError::Validation(format!(
                    "clinic {} does not exist",
                    request.clinic_id
                )));
            }
            let issued = store.count_tickets().await?;
            let sequence = issued
                .checked_add(1)
                .ok_or_else(|| QueueError::Conflict(String::from("ticket counter exhausted")))?;
            let new_ticket = NewTicket {
                patient_name: request.patient_name,
                patient_identification: request.patient_identification,
                patient_phone: request.patient_phone,
                clinic_id: request.clinic_id,
                ticket_number: TicketNumber::from_sequence(sequence),
                state: TicketState::Waiting,
                created_at: Utc::now(),
            };
            let id = store.insert_ticket(&new_ticket).await?;
            new_ticket.with_id(id)
        };

        info!(
            ticket_id = %ticket.id,
            number = %ticket.ticket_number,
            clinic_id = %ticket.clinic_id,
            "Ticket enqueued"
        );
        self.raise(QueueEvent::Enqueued(ticket.id));
        Ok(ticket)
    }

    /// Move the oldest waiting ticket to `Serving`.
    ///
    /// # Errors
    ///
    /// [`QueueError::NoWaitingTickets`] if nobody is waiting,
    /// [`QueueError::Conflict`] if the serving scope blocks every waiting
    /// ticket, and [`QueueError::Storage`] if the store fails.
    pub async fn call_next(&self) -> Result<Ticket, QueueError> {
        self.call_next_matching(None).await
    }

    /// Like [`call_next`](Self::call_next), restricted to one clinic.
    ///
    /// # Errors
    ///
    /// Same as [`call_next`](Self::call_next).
    pub async fn call_next_in(&self, clinic_id: ClinicId) -> Result<Ticket, QueueError> {
        self.call_next_matching(Some(clinic_id)).await
    }

    async fn call_next_matching(&self, clinic_id: Option<ClinicId>) -> Result<Ticket, QueueError> {
        let ticket = {
            let store = self.store.write().await;
            let mut waiting = store.list_by_state(TicketState::Waiting).await?;
            if let Some(clinic_id) = clinic_id {
                waiting.retain(|t| t.clinic_id == clinic_id);
            }
            sort_fifo(&mut waiting);
            let serving = if waiting.is_empty() {
                Vec::new()
            } else {
                store.list_by_state(TicketState::Serving).await?
            };
            let chosen = self.policy.select_next(waiting, &serving)?;
            store.update_state(chosen.id, TicketState::Serving).await?;
            Ticket {
                state: TicketState::Serving,
                ..chosen
            }
        };

        info!(
            ticket_id = %ticket.id,
            number = %ticket.ticket_number,
            clinic_id = %ticket.clinic_id,
            "Ticket called"
        );
        self.raise(QueueEvent::Called(ticket.id));
        Ok(ticket)
    }

    /// Close a ticket that is being served. Finishing an already finished
    /// ticket is a no-op.
    ///
    /// # Errors
    ///
    /// [`QueueError::TicketNotFound`] for an unknown id,
    /// [`QueueError::InvalidTransition`] if the ticket is `Waiting` or
    /// `Absent`, and [`QueueError::Storage`] if the store fails.
    pub async fn finish(&self, id: TicketId) -> Result<Ticket, QueueError> {
        let ticket = self.transition(id, TicketState::Finished).await?;
        info!(ticket_id = %id, number = %ticket.ticket_number, "Ticket finished");
        self.raise(QueueEvent::Finished(id));
        Ok(ticket)
    }

    /// Mark a patient as not present. Applies to waiting tickets, and to
    /// serving tickets unless the policy forbids it. Repeating the call is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// [`QueueError::TicketNotFound`] for an unknown id,
    /// [`QueueError::InvalidTransition`] if the ticket is `Finished` (or
    /// `Serving` under a forbidding policy), and [`QueueError::Storage`] if
    /// the store fails.
    pub async fn mark_absent(&self, id: TicketId) -> Result<Ticket, QueueError> {
        let ticket = self.transition(id, TicketState::Absent).await?;
        info!(ticket_id = %id, number = %ticket.ticket_number, "Ticket marked absent");
        self.raise(QueueEvent::MarkedAbsent(id));
        Ok(ticket)
    }

    /// Fetch one ticket.
    ///
    /// # Errors
    ///
    /// [`QueueError::TicketNotFound`] for an unknown id and
    /// [`QueueError::Storage`] if the store fails.
    pub async fn ticket(&self, id: TicketId) -> Result<Ticket, QueueError> {
        let store = self.store.read().await;
        store
            .get_ticket(id)
            .await?
            .ok_or(QueueError::TicketNotFound(id))
    }

    async fn transition(&self, id: TicketId, to: TicketState) -> Result<Ticket, QueueError> {
        let store = self.store.write().await;
        let ticket = store
            .get_ticket(id)
            .await?
            .ok_or(QueueError::TicketNotFound(id))?;
        match self.policy.check(ticket.state, to) {
            Transition::Apply => {
                store.update_state(id, to).await?;
                Ok(Ticket { state: to, ..ticket })
            }
            Transition::Unchanged => {
                debug!(ticket_id = %id, state = %to, "Ticket already in target state");
                Ok(ticket)
            }
            Transition::Reject => Err(QueueError::InvalidTransition {
                id,
                from: ticket.state,
                to,
            }),
        }
    }

    fn raise(&self, event: QueueEvent) {
        let Some(sender) = &self.events else {
            return;
        };
        match sender.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!(event = event.as_str(), "Publish already pending; event coalesced");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(event = event.as_str(), "Push scheduler is gone; event dropped");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;

    use clinicq_db::{MemoryStore, NewClinic};

    use super::*;
    use crate::policy::ServingScope;

    fn store() -> MemoryStore {
        MemoryStore::with_clinics(&[
            NewClinic::named("Medicina General"),
            NewClinic::named("Pediatría"),
        ])
    }

    fn engine() -> QueueEngine<MemoryStore> {
        QueueEngine::new(store(), QueuePolicy::default())
    }

    fn general() -> ClinicId {
        ClinicId::new(1)
    }

    fn kids() -> ClinicId {
        ClinicId::new(2)
    }

    #[tokio::test]
    async fn first_ticket_is_t001_and_waiting() {
        let engine = engine();
        let ticket = engine
            .enqueue(EnqueueRequest::new("Alice", "ID1", general()))
            .await
            .unwrap();
        assert_eq!(ticket.ticket_number.as_str(), "T-001");
        assert_eq!(ticket.state, TicketState::Waiting);
        assert_eq!(ticket.clinic_id, general());
    }

    #[tokio::test]
    async fn enqueue_trims_and_drops_blank_phone() {
        let engine = engine();
        let ticket = engine
            .enqueue(EnqueueRequest::new("  Bob ", " ID2 ", general()).with_phone("   "))
            .await
            .unwrap();
        assert_eq!(ticket.patient_name, "Bob");
        assert_eq!(ticket.patient_identification, "ID2");
        assert_eq!(ticket.patient_phone, None);
    }

    #[tokio::test]
    async fn enqueue_rejects_blank_fields_without_issuing() {
        let engine = engine();
        let blank_name = engine
            .enqueue(EnqueueRequest::new("   ", "ID1", general()))
            .await;
        assert!(matches!(blank_name, Err(QueueError::Validation(_))));

        let missing_clinic = engine
            .enqueue(EnqueueRequest {
                patient_name: String::from("Alice"),
                patient_identification: String::from("ID1"),
                ..EnqueueRequest::default()
            })
            .await;
        assert!(matches!(missing_clinic, Err(QueueError::Validation(_))));

        let next = engine
            .enqueue(EnqueueRequest::new("Alice", "ID1", general()))
            .await
            .unwrap();
        assert_eq!(next.ticket_number.as_str(), "T-001");
    }

    #[tokio::test]
    async fn enqueue_rejects_unknown_clinic() {
        let engine = engine();
        let result = engine
            .enqueue(EnqueueRequest::new("Alice", "ID1", ClinicId::new(77)))
            .await;
        assert!(matches!(result, Err(QueueError::Validation(_))));
    }

    #[tokio::test]
    async fn call_next_on_empty_queue_is_not_found() {
        let engine = engine();
        assert!(matches!(
            engine.call_next().await,
            Err(QueueError::NoWaitingTickets)
        ));
    }

    #[tokio::test]
    async fn call_next_with_nobody_waiting_mutates_nothing() {
        let (tx, mut rx) = mpsc::channel(16);
        let engine = engine().with_events(tx);
        let mut ids = Vec::new();
        for name in ["Alice", "Bob", "Carl"] {
            let ticket = engine
                .enqueue(EnqueueRequest::new(name, name, general()))
                .await
                .unwrap();
            ids.push(ticket.id);
        }
        let alice = engine.call_next().await.unwrap();
        engine.finish(alice.id).await.unwrap();
        engine.call_next().await.unwrap();
        engine.mark_absent(ids[2]).await.unwrap();
        while rx.try_recv().is_ok() {}

        let mut before = Vec::new();
        for id in &ids {
            before.push(engine.ticket(*id).await.unwrap().state);
        }
        assert_eq!(
            before,
            [TicketState::Finished, TicketState::Serving, TicketState::Absent]
        );

        assert!(matches!(
            engine.call_next().await,
            Err(QueueError::NoWaitingTickets)
        ));

        let dave = engine
            .enqueue(EnqueueRequest::new("Dave", "ID4", general()))
            .await
            .unwrap();
        while rx.try_recv().is_ok() {}
        assert!(matches!(
            engine.call_next_in(kids()).await,
            Err(QueueError::NoWaitingTickets)
        ));

        for (id, state) in ids.iter().zip(before) {
            assert_eq!(engine.ticket(*id).await.unwrap().state, state);
        }
        assert_eq!(engine.ticket(dave.id).await.unwrap().state, TicketState::Waiting);
        assert!(rx.try_recv().is_err(), "a failed call raises no event");
    }

    #[tokio::test]
    async fn alice_bob_carl_scenario() {
        let engine = engine();
        let alice = engine
            .enqueue(EnqueueRequest::new("Alice", "ID1", general()))
            .await
            .unwrap();
        let bob = engine
            .enqueue(EnqueueRequest::new("Bob", "ID2", general()))
            .await
            .unwrap();
        assert_eq!(bob.ticket_number.as_str(), "T-002");

        let called = engine.call_next().await.unwrap();
        assert_eq!(called.id, alice.id);
        assert_eq!(called.state, TicketState::Serving);

        let carl = engine
            .enqueue(EnqueueRequest::new("Carl", "ID3", kids()))
            .await
            .unwrap();
        assert_eq!(carl.ticket_number.as_str(), "T-003");

        let finished = engine.finish(alice.id).await.unwrap();
        assert_eq!(finished.state, TicketState::Finished);

        let called = engine.call_next().await.unwrap();
        assert_eq!(called.id, bob.id);

        let absent = engine.mark_absent(carl.id).await.unwrap();
        assert_eq!(absent.state, TicketState::Absent);

        assert!(matches!(
            engine.call_next().await,
            Err(QueueError::NoWaitingTickets)
        ));
    }

    #[tokio::test]
    async fn finish_and_mark_absent_are_idempotent() {
        let engine = engine();
        let alice = engine
            .enqueue(EnqueueRequest::new("Alice", "ID1", general()))
            .await
            .unwrap();
        let bob = engine
            .enqueue(EnqueueRequest::new("Bob", "ID2", general()))
            .await
            .unwrap();
        engine.call_next().await.unwrap();

        engine.finish(alice.id).await.unwrap();
        let again = engine.finish(alice.id).await.unwrap();
        assert_eq!(again.state, TicketState::Finished);

        engine.mark_absent(bob.id).await.unwrap();
        let again = engine.mark_absent(bob.id).await.unwrap();
        assert_eq!(again.state, TicketState::Absent);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let engine = engine();
        let missing = TicketId::new(42);
        assert!(matches!(
            engine.finish(missing).await,
            Err(QueueError::TicketNotFound(id)) if id == missing
        ));
        assert!(matches!(
            engine.mark_absent(missing).await,
            Err(QueueError::TicketNotFound(_))
        ));
        assert!(matches!(
            engine.ticket(missing).await,
            Err(QueueError::TicketNotFound(_))
        ));
    }

    #[tokio::test]
    async fn finishing_a_waiting_ticket_is_rejected() {
        let engine = engine();
        let alice = engine
            .enqueue(EnqueueRequest::new("Alice", "ID1", general()))
            .await
            .unwrap();
        let result = engine.finish(alice.id).await;
        assert!(matches!(
            result,
            Err(QueueError::InvalidTransition {
                from: TicketState::Waiting,
                to: TicketState::Finished,
                ..
            })
        ));
        assert_eq!(
            engine.ticket(alice.id).await.unwrap().state,
            TicketState::Waiting
        );
    }

    #[tokio::test]
    async fn finished_ticket_cannot_become_absent() {
        let engine = engine();
        let alice = engine
            .enqueue(EnqueueRequest::new("Alice", "ID1", general()))
            .await
            .unwrap();
        engine.call_next().await.unwrap();
        engine.finish(alice.id).await.unwrap();
        assert!(matches!(
            engine.mark_absent(alice.id).await,
            Err(QueueError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn absent_while_serving_follows_policy() {
        let strict = QueueEngine::new(
            store(),
            QueuePolicy {
                allow_absent_while_serving: false,
                ..QueuePolicy::default()
            },
        );
        let alice = strict
            .enqueue(EnqueueRequest::new("Alice", "ID1", general()))
            .await
            .unwrap();
        strict.call_next().await.unwrap();
        assert!(matches!(
            strict.mark_absent(alice.id).await,
            Err(QueueError::InvalidTransition { .. })
        ));

        let permissive = engine();
        let alice = permissive
            .enqueue(EnqueueRequest::new("Alice", "ID1", general()))
            .await
            .unwrap();
        permissive.call_next().await.unwrap();
        let absent = permissive.mark_absent(alice.id).await.unwrap();
        assert_eq!(absent.state, TicketState::Absent);
    }

    #[tokio::test]
    async fn call_next_in_only_considers_that_clinic() {
        let engine = engine();
        engine
            .enqueue(EnqueueRequest::new("Alice", "ID1", general()))
            .await
            .unwrap();
        let carl = engine
            .enqueue(EnqueueRequest::new("Carl", "ID3", kids()))
            .await
            .unwrap();
        let called = engine.call_next_in(kids()).await.unwrap();
        assert_eq!(called.id, carl.id);
        assert!(matches!(
            engine.call_next_in(kids()).await,
            Err(QueueError::NoWaitingTickets)
        ));
    }

    #[tokio::test]
    async fn per_clinic_scope_serves_one_per_clinic() {
        let engine = QueueEngine::new(
            store(),
            QueuePolicy {
                serving_scope: ServingScope::PerClinic,
                ..QueuePolicy::default()
            },
        );
        let alice = engine
            .enqueue(EnqueueRequest::new("Alice", "ID1", general()))
            .await
            .unwrap();
        engine
            .enqueue(EnqueueRequest::new("Bob", "ID2", general()))
            .await
            .unwrap();
        let carl = engine
            .enqueue(EnqueueRequest::new("Carl", "ID3", kids()))
            .await
            .unwrap();

        assert_eq!(engine.call_next().await.unwrap().id, alice.id);
        assert_eq!(engine.call_next().await.unwrap().id, carl.id);
        assert!(matches!(
            engine.call_next().await,
            Err(QueueError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn global_scope_waits_for_finish() {
        let engine = QueueEngine::new(
            store(),
            QueuePolicy {
                serving_scope: ServingScope::Global,
                ..QueuePolicy::default()
            },
        );
        let alice = engine
            .enqueue(EnqueueRequest::new("Alice", "ID1", general()))
            .await
            .unwrap();
        let bob = engine
            .enqueue(EnqueueRequest::new("Bob", "ID2", kids()))
            .await
            .unwrap();
        engine.call_next().await.unwrap();
        assert!(matches!(
            engine.call_next().await,
            Err(QueueError::Conflict(_))
        ));
        engine.finish(alice.id).await.unwrap();
        assert_eq!(engine.call_next().await.unwrap().id, bob.id);
    }

    #[tokio::test]
    async fn mutations_raise_events() {
        let (tx, mut rx) = mpsc::channel(8);
        let engine = engine().with_events(tx);
        let alice = engine
            .enqueue(EnqueueRequest::new("Alice", "ID1", general()))
            .await
            .unwrap();
        engine.call_next().await.unwrap();
        engine.finish(alice.id).await.unwrap();
        engine.finish(alice.id).await.unwrap();

        assert_eq!(rx.recv().await, Some(QueueEvent::Enqueued(alice.id)));
        assert_eq!(rx.recv().await, Some(QueueEvent::Called(alice.id)));
        assert_eq!(rx.recv().await, Some(QueueEvent::Finished(alice.id)));
        assert_eq!(rx.recv().await, Some(QueueEvent::Finished(alice.id)));
    }

    #[tokio::test]
    async fn failed_operations_raise_no_event() {
        let (tx, mut rx) = mpsc::channel(8);
        let engine = engine().with_events(tx);
        assert!(engine.call_next().await.is_err());
        assert!(engine.finish(TicketId::new(5)).await.is_err());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn full_event_channel_never_blocks_mutations() {
        let (tx, _rx) = mpsc::channel(1);
        let engine = engine().with_events(tx);
        for n in 0..5 {
            engine
                .enqueue(EnqueueRequest::new("Patient", &format!("ID{n}"), general()))
                .await
                .unwrap();
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_enqueues_number_without_gaps() {
        let engine = Arc::new(engine());
        let handles: Vec<_> = (0..40)
            .map(|n| {
                let engine = Arc::clone(&engine);
                tokio::spawn(async move {
                    engine
                        .enqueue(EnqueueRequest::new("Patient", &format!("ID{n}"), general()))
                        .await
                })
            })
            .collect();

        let mut sequences = Vec::new();
        for handle in handles {
            let ticket = handle.await.unwrap().unwrap();
            sequences.push(ticket.ticket_number.sequence().unwrap());
        }
        sequences.sort_unstable();
        assert_eq!(sequences, (1..=40).collect::<Vec<u64>>());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_call_next_returns_distinct_tickets() {
        let engine = Arc::new(engine());
        for n in 0..10 {
            engine
                .enqueue(EnqueueRequest::new("Patient", &format!("ID{n}"), general()))
                .await
                .unwrap();
        }

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let engine = Arc::clone(&engine);
                tokio::spawn(async move { engine.call_next().await })
            })
            .collect();

        let mut called = Vec::new();
        let mut empty = 0_u32;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(ticket) => {
                    assert_eq!(ticket.state, TicketState::Serving);
                    called.push(ticket.id);
                }
                Err(QueueError::NoWaitingTickets) => empty = empty.saturating_add(1),
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        called.sort_unstable();
        called.dedup();
        assert_eq!(called.len(), 10);
        assert_eq!(empty, 6);
    }
}
