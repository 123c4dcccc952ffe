//! Delivery collaborator boundary.

use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::dispatcher::RenderedNotification;

/// Delivery failure reported by a sender.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// Transient; the same notification may be retried later.
    #[error("delivery channel unavailable: {0}")]
    Unavailable(String),

    /// The channel refused this notification; retrying will not help.
    #[error("delivery rejected: {0}")]
    Rejected(String),
}

impl DeliveryError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, DeliveryError::Unavailable(_))
    }
}

/// Transmits rendered notifications (mail, push, in-app).
pub trait NotificationSender: Send + Sync {
    fn send(&self, notification: &RenderedNotification) -> Result<(), DeliveryError>;
}

impl<S> NotificationSender for Arc<S>
where
    S: NotificationSender + ?Sized,
{
    fn send(&self, notification: &RenderedNotification) -> Result<(), DeliveryError> {
        (**self).send(notification)
    }
}

/// Sender that logs each notification through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingSender;

impl NotificationSender for LoggingSender {
    fn send(&self, notification: &RenderedNotification) -> Result<(), DeliveryError> {
        tracing::info!(
            order_number = %notification.order_number,
            status = %notification.status,
            role = %notification.role,
            recipient = %notification.recipient,
            subject = %notification.subject,
            action_url = %notification.action_url,
            "notification sent"
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
struct RecordingState {
    sent: Vec<RenderedNotification>,
    failures_left: usize,
}

/// In-memory sender that keeps everything it was handed.
///
/// Can be told to fail the next `n` sends, for exercising retry paths.
#[derive(Debug, Default)]
pub struct RecordingSender {
    state: Mutex<RecordingState>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` sends with `DeliveryError::Unavailable`.
    pub fn fail_next(&self, n: usize) {
        if let Ok(mut state) = self.state.lock() {
            state.failures_left = n;
        }
    }

    /// Successfully sent notifications, in send order.
    pub fn sent(&self) -> Vec<RenderedNotification> {
        self.state
            .lock()
            .map(|state| state.sent.clone())
            .unwrap_or_default()
    }
}

impl NotificationSender for RecordingSender {
    fn send(&self, notification: &RenderedNotification) -> Result<(), DeliveryError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| DeliveryError::Unavailable("lock poisoned".to_string()))?;

        if state.failures_left > 0 {
            state.failures_left -= 1;
            return Err(DeliveryError::Unavailable("simulated outage".to_string()));
        }

        state.sent.push(notification.clone());
        Ok(())
    }
}
