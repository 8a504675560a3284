//! Outbox worker.
//!
//! Drains undelivered [`OutboxEvent`]s, renders them, and hands each email
//! to the configured [`EmailSender`] on the blocking pool. Failures are
//! recorded on the row and retried on later drains until `max_attempts`.
//!
//! [`OutboxEvent`]: campus_store::OutboxEvent

use std::sync::Arc;
use std::time::Duration;

use chrono::FixedOffset;
use futures::future::join_all;
use tokio::sync::Notify;

use campus_store::{Database, OutboxEntry};

use super::templates::{render, RenderContext};
use super::{DeliveryError, EmailSender, OutgoingEmail};
use crate::clock::Clock;

const BATCH_SIZE: u32 = 50;

/// Outcome of one drain pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct Dispatcher {
    db: Arc<Database>,
    sender: Arc<dyn EmailSender>,
    clock: Arc<dyn Clock>,
    base_url: Arc<str>,
    campus_offset: FixedOffset,
    max_attempts: u32,
    wake: Arc<Notify>,
}

impl Dispatcher {
    pub fn new(
        db: Arc<Database>,
        sender: Arc<dyn EmailSender>,
        clock: Arc<dyn Clock>,
        base_url: &str,
        campus_offset: FixedOffset,
        max_attempts: u32,
    ) -> Self {
        Self {
            db,
            sender,
            clock,
            base_url: Arc::from(base_url),
            campus_offset,
            max_attempts,
            wake: Arc::new(Notify::new()),
        }
    }

    /// Ask the worker to drain soon. Cheap; callers use it after enqueueing.
    pub fn wake(&self) {
        self.wake.notify_one();
    }

    /// Deliver one batch of pending events.
    pub async fn drain(&self) -> DrainReport {
        let pending = match self.db.pending_outbox(BATCH_SIZE, self.max_attempts) {
            Ok(pending) => pending,
            Err(e) => {
                tracing::error!(error = %e, "failed to read outbox");
                return DrainReport::default();
            }
        };
        if pending.is_empty() {
            return DrainReport::default();
        }

        let attempts = pending.into_iter().map(|entry| self.deliver(entry));
        let results = join_all(attempts).await;

        let mut report = DrainReport::default();
        for (id, result) in results {
            match result {
                Ok(()) => {
                    if let Err(e) = self.db.mark_delivered(id, self.clock.now()) {
                        tracing::error!(id, error = %e, "failed to mark outbox row delivered");
                    }
                    report.delivered += 1;
                }
                Err(reason) => {
                    match self.db.record_delivery_failure(id, &reason) {
                        Ok(attempts) if attempts >= self.max_attempts => {
                            tracing::warn!(id, attempts, error = %reason, "giving up on notification");
                        }
                        Ok(attempts) => {
                            tracing::warn!(id, attempts, error = %reason, "notification delivery failed");
                        }
                        Err(e) => {
                            tracing::error!(id, error = %e, "failed to record delivery failure");
                        }
                    }
                    report.failed += 1;
                }
            }
        }

        tracing::debug!(delivered = report.delivered, failed = report.failed, "outbox drained");
        report
    }

    async fn deliver(&self, entry: OutboxEntry) -> (i64, Result<(), String>) {
        let ctx = RenderContext {
            db: &self.db,
            base_url: &self.base_url,
            campus_offset: self.campus_offset,
        };
        let email = match render(&entry.event, &ctx) {
            Ok(email) => email,
            Err(e) => return (entry.id, Err(e.to_string())),
        };

        let result = send_blocking(Arc::clone(&self.sender), email)
            .await
            .map_err(|e| e.to_string());
        (entry.id, result)
    }

    /// Drain whenever woken, and at least every `poll` interval.
    pub async fn run(self, poll: Duration) {
        let mut interval = tokio::time::interval(poll);
        loop {
            tokio::select! {
                _ = self.wake.notified() => {}
                _ = interval.tick() => {}
            }
            self.drain().await;
        }
    }
}

async fn send_blocking(
    sender: Arc<dyn EmailSender>,
    email: OutgoingEmail,
) -> Result<(), DeliveryError> {
    tokio::task::spawn_blocking(move || sender.send(&email))
        .await
        .map_err(|e| DeliveryError::Task(e.to_string()))?
}
