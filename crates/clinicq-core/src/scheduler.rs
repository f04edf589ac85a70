//! Background task that pushes fresh waiting lists to displays.
//!
//! One task, two triggers: a fixed interval and the engine's queue-changed
//! events. Both run the same step: read [`QueueEngine::waiting_list`]
//! (the read guard is released before fan-out) and publish it as a
//! `queue_update`. Events that pile up while a step runs are drained and
//! coalesced into the next step.
//!
//! A step that fails or panics is logged and the loop keeps going; the
//! task only returns when the shutdown signal fires.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use clinicq_db::TicketStore;
use clinicq_types::BroadcastMessage;
use futures::FutureExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::broadcaster::{Broadcaster, PublishReport};
use crate::engine::QueueEngine;
use crate::error::QueueError;
use crate::events::QueueEvent;

/// Default period between unconditional pushes, in milliseconds.
pub const DEFAULT_PUSH_INTERVAL_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy)]
enum Trigger {
    Interval,
    Event { coalesced: usize },
}

impl Trigger {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Interval => "interval",
            Self::Event { .. } => "event",
        }
    }

    const fn coalesced(self) -> usize {
        match self {
            Self::Interval => 0,
            Self::Event { coalesced } => coalesced,
        }
    }
}

/// Periodic and event-driven publisher of queue snapshots.
pub struct PushScheduler<S> {
    engine: Arc<QueueEngine<S>>,
    broadcaster: Arc<Broadcaster>,
    interval: Duration,
}

impl<S: TicketStore + 'static> PushScheduler<S> {
    /// Create a scheduler that publishes at least every `interval`.
    pub fn new(
        engine: Arc<QueueEngine<S>>,
        broadcaster: Arc<Broadcaster>,
        interval: Duration,
    ) -> Self {
        Self {
            engine,
            broadcaster,
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    /// Take a snapshot and publish it once.
    ///
    /// # Errors
    ///
    /// Returns the engine's error if the waiting list cannot be read.
    pub async fn publish_now(&self) -> Result<PublishReport, QueueError> {
        let queue = self.engine.waiting_list().await?;
        let report = self
            .broadcaster
            .publish(BroadcastMessage::QueueUpdate { queue })
            .await;
        Ok(report)
    }

    /// Start the background loop.
    ///
    /// The task exits after the current step once `shutdown` turns `true`
    /// or its sender is dropped.
    pub fn spawn(
        self,
        events: mpsc::Receiver<QueueEvent>,
        shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(self.run(events, shutdown))
    }

    async fn run(
        self,
        mut events: mpsc::Receiver<QueueEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(
            interval_ms = u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX),
            "Push scheduler started"
        );
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut events_open = true;

        loop {
            if *shutdown.borrow() {
                break;
            }
            let trigger = tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                event = events.recv(), if events_open => {
                    let Some(event) = event else {
                        debug!("Queue event channel closed; continuing on interval only");
                        events_open = false;
                        continue;
                    };
                    let mut coalesced = 0_usize;
                    while events.try_recv().is_ok() {
                        coalesced = coalesced.saturating_add(1);
                    }
                    debug!(
                        event = event.as_str(),
                        ticket_id = %event.ticket_id(),
                        coalesced,
                        "Queue changed"
                    );
                    Trigger::Event { coalesced }
                }
                _ = ticker.tick() => Trigger::Interval,
            };

            self.step(trigger).await;
        }

        info!("Push scheduler stopped");
    }

    async fn step(&self, trigger: Trigger) {
        match AssertUnwindSafe(self.publish_now()).catch_unwind().await {
            Ok(Ok(report)) => {
                debug!(
                    trigger = trigger.as_str(),
                    coalesced = trigger.coalesced(),
                    delivered = report.delivered,
                    dropped = report.dropped.len(),
                    closed = report.closed.len(),
                    "Queue update published"
                );
            }
            Ok(Err(e)) => {
                error!(trigger = trigger.as_str(), error = %e, "Queue snapshot failed; will retry");
            }
            Err(_) => {
                error!(trigger = trigger.as_str(), "Queue push step panicked; will retry");
            }
        }
    }
}
