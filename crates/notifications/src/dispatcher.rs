//! Rendering of notification batches.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use marketplace_catalog::{CurrencyFormatter, StandardCurrencyFormatter};
use marketplace_core::{Locale, Role, UserId};
use marketplace_orders::{NotificationEvent, NotificationStatus, Order, OrderId, OrderNumber};

use crate::template::{lookup, render_url};

/// Who a rendered notification is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Recipient {
    User(UserId),
    /// Platform operators as a group.
    Admins,
}

impl core::fmt::Display for Recipient {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Recipient::User(id) => write!(f, "user:{id}"),
            Recipient::Admins => f.write_str("admins"),
        }
    }
}

/// A message ready for the delivery collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedNotification {
    pub order_id: OrderId,
    pub order_number: OrderNumber,
    pub status: NotificationStatus,
    pub role: Role,
    pub recipient: Recipient,
    pub subject: String,
    pub label: String,
    pub description: String,
    pub body: String,
    pub action_url: String,
}

/// Renders role-specific copy for an order's notification batch.
///
/// Performs no delivery; see [`crate::NotificationSender`].
#[derive(Clone)]
pub struct NotificationDispatcher {
    base_url: String,
    locale: Locale,
    formatter: Arc<dyn CurrencyFormatter>,
}

impl core::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("base_url", &self.base_url)
            .field("locale", &self.locale)
            .finish_non_exhaustive()
    }
}

impl NotificationDispatcher {
    pub fn new(base_url: impl Into<String>, locale: Locale) -> Self {
        Self {
            base_url: base_url.into(),
            locale,
            formatter: Arc::new(StandardCurrencyFormatter),
        }
    }

    pub fn with_formatter(mut self, formatter: Arc<dyn CurrencyFormatter>) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    /// Render one notification per role in `roles`, in the given order.
    ///
    /// An order that was never placed has no one to notify and yields an
    /// empty batch.
    pub fn dispatch(
        &self,
        order: &Order,
        status: NotificationStatus,
        roles: &[Role],
        payload: Option<&str>,
    ) -> Vec<RenderedNotification> {
        let Some(order_number) = order.order_number() else {
            tracing::warn!(order_id = %order.id_typed(), %status, "notification requested for an unplaced order");
            return Vec::new();
        };

        roles
            .iter()
            .map(|role| self.render_one(order, order_number, status, *role, payload))
            .collect()
    }

    /// Render a batch produced by [`Order::notifications_for`].
    pub fn render_batch(&self, order: &Order, batch: &[NotificationEvent]) -> Vec<RenderedNotification> {
        batch
            .iter()
            .map(|event| {
                self.render_one(
                    order,
                    &event.order_number,
                    event.status,
                    event.recipient,
                    event.payload.as_deref(),
                )
            })
            .collect()
    }

    fn render_one(
        &self,
        order: &Order,
        order_number: &OrderNumber,
        status: NotificationStatus,
        role: Role,
        payload: Option<&str>,
    ) -> RenderedNotification {
        let copy = lookup(status, role);
        let order_id = order.id_typed();

        let recipient = match order.participant(role) {
            Some(user) => Recipient::User(user),
            None => Recipient::Admins,
        };

        let action_url = render_url(
            copy.action_url,
            &self.base_url,
            &order_id.to_string(),
            order_number.as_str(),
        );

        RenderedNotification {
            order_id,
            order_number: order_number.clone(),
            status,
            role,
            recipient,
            subject: format!("[{order_number}] {}", copy.label),
            label: copy.label.to_string(),
            description: copy.description.to_string(),
            body: self.body(order, order_number, copy.description, payload),
            action_url,
        }
    }

    fn body(
        &self,
        order: &Order,
        order_number: &OrderNumber,
        description: &str,
        payload: Option<&str>,
    ) -> String {
        let mut lines = vec![description.to_string(), format!("Order: {order_number}")];

        if let Some(placement) = order.placement() {
            lines.push(format!("Service: {}", placement.service_title));
            lines.push(format!(
                "Package: {} ({})",
                placement.snapshot.package_name,
                self.formatter.format(&placement.snapshot.price, &self.locale)
            ));
        }
        if let Some(due) = order.due_date() {
            lines.push(format!("Due: {}", due.format("%Y-%m-%d %H:%M UTC")));
        }
        if let Some(text) = payload.map(str::trim).filter(|t| !t.is_empty()) {
            lines.push(format!("Message: {text}"));
        }

        lines.join("\n")
    }
}
