//! Notification outbox: deliveries that failed and are waiting for a retry.
//!
//! The order transition that produced a notification is already committed by
//! the time it lands here. Retrying never touches the event store.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use marketplace_notifications::{DeliveryError, NotificationSender, RenderedNotification};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboxStatus {
    Pending,
    /// Gave up: attempts exhausted or the channel rejected it outright.
    Dead,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub notification: RenderedNotification,
    pub attempts: u32,
    pub last_error: String,
    pub status: OutboxStatus,
    pub enqueued_at: DateTime<Utc>,
}

/// Outcome of one retry pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryReport {
    pub delivered: usize,
    pub still_pending: usize,
    pub dead: usize,
}

#[derive(Debug)]
pub struct Outbox {
    entries: Mutex<Vec<OutboxEntry>>,
    max_attempts: u32,
}

impl Outbox {
    /// `max_attempts` counts the original send.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Record a notification whose first send failed.
    pub fn enqueue(&self, notification: RenderedNotification, error: &DeliveryError) {
        let status = if error.is_retryable() && self.max_attempts > 1 {
            OutboxStatus::Pending
        } else {
            OutboxStatus::Dead
        };

        let entry = OutboxEntry {
            notification,
            attempts: 1,
            last_error: error.to_string(),
            status,
            enqueued_at: Utc::now(),
        };

        match self.entries.lock() {
            Ok(mut entries) => entries.push(entry),
            Err(_) => tracing::error!(
                order_number = %entry.notification.order_number,
                "outbox lock poisoned; notification dropped"
            ),
        }
    }

    /// Entries still waiting for a retry.
    pub fn pending(&self) -> Vec<OutboxEntry> {
        self.snapshot(OutboxStatus::Pending)
    }

    pub fn dead_letters(&self) -> Vec<OutboxEntry> {
        self.snapshot(OutboxStatus::Dead)
    }

    fn snapshot(&self, status: OutboxStatus) -> Vec<OutboxEntry> {
        self.entries
            .lock()
            .map(|entries| entries.iter().filter(|e| e.status == status).cloned().collect())
            .unwrap_or_default()
    }

    /// Try every pending entry once more through `sender`.
    ///
    /// Delivered entries leave the outbox. Entries that hit `max_attempts`, or
    /// whose error is not retryable, become dead letters. Pending entries are
    /// taken out before sending, so `enqueue` never waits on the channel and
    /// overlapping passes never send the same entry twice.
    pub fn retry_pending(&self, sender: &dyn NotificationSender) -> RetryReport {
        let mut report = RetryReport::default();
        let taken: Vec<OutboxEntry> = match self.entries.lock() {
            Ok(mut entries) => {
                let (pending, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut *entries)
                    .into_iter()
                    .partition(|e| e.status == OutboxStatus::Pending);
                *entries = rest;
                pending
            }
            Err(_) => {
                tracing::error!("outbox lock poisoned; retry skipped");
                return report;
            }
        };

        let mut survivors = Vec::new();
        for mut entry in taken {
            entry.attempts += 1;
            let err = match sender.send(&entry.notification) {
                Ok(()) => {
                    report.delivered += 1;
                    continue;
                }
                Err(err) => err,
            };

            entry.last_error = err.to_string();
            if !err.is_retryable() || entry.attempts >= self.max_attempts {
                entry.status = OutboxStatus::Dead;
                report.dead += 1;
                tracing::warn!(
                    order_number = %entry.notification.order_number,
                    role = %entry.notification.role,
                    attempts = entry.attempts,
                    error = %err,
                    "notification delivery abandoned"
                );
            } else {
                report.still_pending += 1;
            }
            survivors.push(entry);
        }

        match self.entries.lock() {
            Ok(mut entries) => entries.extend(survivors),
            Err(_) => tracing::error!(
                dropped = survivors.len(),
                "outbox lock poisoned; retried notifications dropped"
            ),
        }

        report
    }
}
