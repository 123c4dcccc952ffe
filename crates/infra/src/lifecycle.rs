//! Order lifecycle application service.
//!
//! Composes the pieces an order action needs: pricing at placement, the
//! locked command pipeline for every transition, rendering of the resulting
//! notification batch, and hand-off to the delivery collaborator. Delivery
//! failures go to the outbox; they never undo a committed transition.

use chrono::Utc;
use serde_json::Value as JsonValue;

use marketplace_catalog::{ServiceId, resolve};
use marketplace_core::{AggregateId, Locale, Role, UserId};
use marketplace_events::{Event, EventBus, EventEnvelope};
use marketplace_notifications::{NotificationDispatcher, NotificationSender, RenderedNotification};
use marketplace_orders::{
    AcceptDelivery, CancelOrder, LifecycleEvent, Order, OrderCommand, OrderEvent, OrderId,
    PlaceOrder, RequestRevision, StartWork, SubmitDelivery, VerifyPayment,
};

use crate::catalog_store::ServiceCatalog;
use crate::command_dispatcher::{CommandDispatcher, DispatchError};
use crate::config::MarketplaceConfig;
use crate::event_store::EventStore;
use crate::outbox::{Outbox, RetryReport};

/// Aggregate type recorded on every order stream.
pub const ORDER_AGGREGATE_TYPE: &str = "orders.order";

/// A buyer's request to order a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceOrderRequest {
    pub buyer: UserId,
    pub service_id: ServiceId,
    /// Exact package name; anything else falls back to the default package.
    pub package: Option<String>,
    pub requirements: Vec<String>,
    pub notes: Option<String>,
}

/// Result of an accepted order action.
#[derive(Debug, Clone)]
pub struct LifecycleOutcome {
    pub order: Order,
    pub events: Vec<OrderEvent>,
    /// Every notification rendered for the batch, delivered or not.
    pub notifications: Vec<RenderedNotification>,
    /// How many of them failed to send and were queued in the outbox.
    pub queued: usize,
    /// The transition is committed but the bus refused its events.
    pub publish_error: Option<String>,
}

pub struct OrderLifecycle<S, B, C, N> {
    dispatcher: CommandDispatcher<S, B>,
    catalog: C,
    sender: N,
    notifier: NotificationDispatcher,
    outbox: Outbox,
    locale: Locale,
}

impl<S, B, C, N> OrderLifecycle<S, B, C, N> {
    pub fn new(store: S, bus: B, catalog: C, sender: N, config: &MarketplaceConfig) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(store, bus),
            catalog,
            sender,
            notifier: NotificationDispatcher::new(config.base_url.clone(), config.locale.clone()),
            outbox: Outbox::new(config.max_delivery_attempts),
            locale: config.locale.clone(),
        }
    }

    /// Swap the notification renderer (e.g. for a custom currency formatter).
    pub fn with_notifier(mut self, notifier: NotificationDispatcher) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn dispatcher(&self) -> &CommandDispatcher<S, B> {
        &self.dispatcher
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }
}

impl<S, B, C, N> OrderLifecycle<S, B, C, N>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
    C: ServiceCatalog,
    N: NotificationSender,
{
    /// Price the requested service and place the order.
    pub fn place_order(&self, request: PlaceOrderRequest) -> Result<LifecycleOutcome, DispatchError> {
        let service = self
            .catalog
            .service(request.service_id)?
            .ok_or(DispatchError::NotFound)?;
        let selection = resolve(&service, request.package.as_deref(), &self.locale)?;

        let order_id = OrderId::new(AggregateId::new());
        let command = PlaceOrder::for_service(
            order_id,
            request.buyer,
            &service,
            selection,
            request.requirements,
            request.notes,
            &self.locale,
            Utc::now(),
        );

        self.run(order_id, OrderCommand::PlaceOrder(command))
    }

    /// Raise a lifecycle event on an order. `actor` is recorded on
    /// cancellations; checking that the actor may raise `event` is the
    /// caller's job.
    pub fn apply(
        &self,
        order_id: OrderId,
        event: LifecycleEvent,
        actor: Role,
    ) -> Result<LifecycleOutcome, DispatchError> {
        let occurred_at = Utc::now();
        let command = match event {
            LifecycleEvent::VerifyPayment => OrderCommand::VerifyPayment(VerifyPayment {
                order_id,
                occurred_at,
            }),
            LifecycleEvent::StartWork => OrderCommand::StartWork(StartWork {
                order_id,
                occurred_at,
            }),
            LifecycleEvent::SubmitDelivery { message } => OrderCommand::SubmitDelivery(SubmitDelivery {
                order_id,
                message,
                occurred_at,
            }),
            LifecycleEvent::RequestRevision { feedback } => {
                OrderCommand::RequestRevision(RequestRevision {
                    order_id,
                    feedback,
                    occurred_at,
                })
            }
            LifecycleEvent::AcceptDelivery => OrderCommand::AcceptDelivery(AcceptDelivery {
                order_id,
                occurred_at,
            }),
            LifecycleEvent::Cancel { reason } => OrderCommand::CancelOrder(CancelOrder {
                order_id,
                by: actor,
                reason,
                occurred_at,
            }),
        };

        self.run(order_id, command)
    }

    pub fn verify_payment(&self, order_id: OrderId) -> Result<LifecycleOutcome, DispatchError> {
        self.apply(order_id, LifecycleEvent::VerifyPayment, Role::Admin)
    }

    pub fn start_work(&self, order_id: OrderId) -> Result<LifecycleOutcome, DispatchError> {
        self.apply(order_id, LifecycleEvent::StartWork, Role::Freelancer)
    }

    pub fn submit_delivery(
        &self,
        order_id: OrderId,
        message: Option<&str>,
    ) -> Result<LifecycleOutcome, DispatchError> {
        let event = LifecycleEvent::SubmitDelivery {
            message: message.map(str::to_string),
        };
        self.apply(order_id, event, Role::Freelancer)
    }

    pub fn request_revision(
        &self,
        order_id: OrderId,
        feedback: Option<&str>,
    ) -> Result<LifecycleOutcome, DispatchError> {
        let event = LifecycleEvent::RequestRevision {
            feedback: feedback.map(str::to_string),
        };
        self.apply(order_id, event, Role::Client)
    }

    pub fn accept_delivery(&self, order_id: OrderId) -> Result<LifecycleOutcome, DispatchError> {
        self.apply(order_id, LifecycleEvent::AcceptDelivery, Role::Client)
    }

    pub fn cancel(
        &self,
        order_id: OrderId,
        by: Role,
        reason: Option<&str>,
    ) -> Result<LifecycleOutcome, DispatchError> {
        let event = LifecycleEvent::Cancel {
            reason: reason.map(str::to_string),
        };
        self.apply(order_id, event, by)
    }

    /// Current state of a placed order.
    pub fn order(&self, order_id: OrderId) -> Result<Order, DispatchError> {
        let order = self
            .dispatcher
            .load(order_id.0, |id| Order::empty(OrderId::new(id)))?;
        if !order.is_placed() {
            return Err(DispatchError::NotFound);
        }
        Ok(order)
    }

    /// One retry pass over the outbox.
    pub fn retry_deliveries(&self) -> RetryReport {
        let report = self.outbox.retry_pending(&self.sender);
        if report != RetryReport::default() {
            tracing::info!(
                delivered = report.delivered,
                still_pending = report.still_pending,
                dead = report.dead,
                "notification retry pass"
            );
        }
        report
    }

    fn run(&self, order_id: OrderId, command: OrderCommand) -> Result<LifecycleOutcome, DispatchError> {
        let committed = self
            .dispatcher
            .execute(order_id.0, ORDER_AGGREGATE_TYPE, command, |id| {
                Order::empty(OrderId::new(id))
            })
            .inspect_err(|e| tracing::debug!(order_id = %order_id, error = %e, "order command rejected"))?;

        let order = committed.aggregate;
        let mut notifications = Vec::new();
        let mut queued = 0;

        for event in &committed.events {
            tracing::info!(
                order_id = %order_id,
                order_number = %order.order_number().map(ToString::to_string).unwrap_or_default(),
                event_type = event.event_type(),
                status = %event.resulting_status(),
                version = committed.stored.last().map(|s| s.sequence_number).unwrap_or(0),
                "order transition committed"
            );

            let batch = order.notifications_for(event);
            for notification in self.notifier.render_batch(&order, &batch) {
                if let Err(err) = self.sender.send(&notification) {
                    tracing::warn!(
                        order_id = %order_id,
                        role = %notification.role,
                        status = %notification.status,
                        error = %err,
                        "notification delivery failed; queued for retry"
                    );
                    self.outbox.enqueue(notification.clone(), &err);
                    queued += 1;
                }
                notifications.push(notification);
            }
        }

        Ok(LifecycleOutcome {
            order,
            events: committed.events,
            notifications,
            queued,
            publish_error: committed.publish_error,
        })
    }
}
