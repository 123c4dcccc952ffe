use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use marketplace_catalog::{Money, PricedSelection, Service, ServiceId};
use marketplace_core::{Aggregate, AggregateId, AggregateRoot, DomainError, Locale, Role, UserId};
use marketplace_events::Event;

use crate::machine::{LifecycleEvent, SideEffect, Transition, notify_effects, transition};
use crate::number::OrderNumber;
use crate::status::{NotificationStatus, OrderStatus, PaymentStatus};

/// Order identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub AggregateId);

impl OrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for OrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// What was bought, by whom, frozen at placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub order_number: OrderNumber,
    pub buyer: UserId,
    pub seller: UserId,
    pub service_id: ServiceId,
    pub service_title: String,
    /// Later edits to the package never reach this copy.
    pub snapshot: PricedSelection,
    pub requirements: Vec<String>,
    pub notes: Option<String>,
    pub placed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub message: Option<String>,
    pub delivered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionRecord {
    pub feedback: Option<String>,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cancellation {
    pub by: Role,
    pub reason: Option<String>,
    pub cancelled_at: DateTime<Utc>,
}

/// Notification value object: one per recipient role of an accepted
/// transition. Never persisted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub order_id: OrderId,
    pub order_number: OrderNumber,
    pub status: NotificationStatus,
    pub recipient: Role,
    pub payload: Option<String>,
}

/// Aggregate root: Order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    id: OrderId,
    placement: Option<Placement>,
    status: OrderStatus,
    payment_status: PaymentStatus,
    due_date: Option<DateTime<Utc>>,
    deliveries: Vec<DeliveryRecord>,
    revision_requests: Vec<RevisionRecord>,
    cancellation: Option<Cancellation>,
    updated_at: Option<DateTime<Utc>>,
    version: u64,
}

impl Order {
    /// Create an empty, not-yet-placed aggregate instance for rehydration.
    pub fn empty(id: OrderId) -> Self {
        Self {
            id,
            placement: None,
            status: OrderStatus::PendingPayment,
            payment_status: PaymentStatus::Pending,
            due_date: None,
            deliveries: Vec::new(),
            revision_requests: Vec::new(),
            cancellation: None,
            updated_at: None,
            version: 0,
        }
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn is_placed(&self) -> bool {
        self.placement.is_some()
    }

    pub fn placement(&self) -> Option<&Placement> {
        self.placement.as_ref()
    }

    pub fn order_number(&self) -> Option<&OrderNumber> {
        self.placement.as_ref().map(|p| &p.order_number)
    }

    /// Always the snapshot price; never recomputed from a live package.
    pub fn total(&self) -> Option<&Money> {
        self.placement.as_ref().map(|p| &p.snapshot.price)
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn due_date(&self) -> Option<DateTime<Utc>> {
        self.due_date
    }

    pub fn deliveries(&self) -> &[DeliveryRecord] {
        &self.deliveries
    }

    pub fn revision_requests(&self) -> &[RevisionRecord] {
        &self.revision_requests
    }

    pub fn cancellation(&self) -> Option<&Cancellation> {
        self.cancellation.as_ref()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.placement.as_ref().map(|p| p.placed_at)
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// User behind a recipient role; `None` for admins (a group, not a user).
    pub fn participant(&self, role: Role) -> Option<UserId> {
        let placement = self.placement.as_ref()?;
        match role {
            Role::Client => Some(placement.buyer),
            Role::Freelancer => Some(placement.seller),
            Role::Admin => None,
        }
    }

    /// Notification batch for an event this order has applied.
    pub fn notifications_for(&self, event: &OrderEvent) -> Vec<NotificationEvent> {
        let Some(order_number) = self.order_number() else {
            return Vec::new();
        };
        notify_effects(event.notification_status(), event.payload())
            .into_iter()
            .filter_map(|effect| match effect {
                SideEffect::Notify { role, payload } => Some(NotificationEvent {
                    order_id: self.id,
                    order_number: order_number.clone(),
                    status: event.notification_status(),
                    recipient: role,
                    payload,
                }),
                _ => None,
            })
            .collect()
    }
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: PlaceOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub order_id: OrderId,
    pub order_number: OrderNumber,
    pub buyer: UserId,
    pub seller: UserId,
    pub service_id: ServiceId,
    pub service_title: String,
    pub selection: PricedSelection,
    pub requirements: Vec<String>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl PlaceOrder {
    /// Build a placement against `service`, taking the seller from the
    /// service owner and the title in the buyer's locale.
    #[allow(clippy::too_many_arguments)]
    pub fn for_service(
        order_id: OrderId,
        buyer: UserId,
        service: &Service,
        selection: PricedSelection,
        requirements: Vec<String>,
        notes: Option<String>,
        locale: &Locale,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id,
            order_number: OrderNumber::generate(order_id.0, occurred_at),
            buyer,
            seller: service.owner(),
            service_id: service.id_typed(),
            service_title: service.title().resolve(locale).clone(),
            selection,
            requirements,
            notes,
            occurred_at,
        }
    }
}

/// Command: VerifyPayment (admin).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyPayment {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: StartWork (freelancer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartWork {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SubmitDelivery (freelancer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitDelivery {
    pub order_id: OrderId,
    pub message: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RequestRevision (client).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRevision {
    pub order_id: OrderId,
    pub feedback: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AcceptDelivery (client).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptDelivery {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CancelOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrder {
    pub order_id: OrderId,
    pub by: Role,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderCommand {
    PlaceOrder(PlaceOrder),
    VerifyPayment(VerifyPayment),
    StartWork(StartWork),
    SubmitDelivery(SubmitDelivery),
    RequestRevision(RequestRevision),
    AcceptDelivery(AcceptDelivery),
    CancelOrder(CancelOrder),
}

impl OrderCommand {
    pub fn order_id(&self) -> OrderId {
        match self {
            OrderCommand::PlaceOrder(c) => c.order_id,
            OrderCommand::VerifyPayment(c) => c.order_id,
            OrderCommand::StartWork(c) => c.order_id,
            OrderCommand::SubmitDelivery(c) => c.order_id,
            OrderCommand::RequestRevision(c) => c.order_id,
            OrderCommand::AcceptDelivery(c) => c.order_id,
            OrderCommand::CancelOrder(c) => c.order_id,
        }
    }

    /// State-machine event this command raises; `None` for placement.
    pub fn lifecycle_event(&self) -> Option<LifecycleEvent> {
        match self {
            OrderCommand::PlaceOrder(_) => None,
            OrderCommand::VerifyPayment(_) => Some(LifecycleEvent::VerifyPayment),
            OrderCommand::StartWork(_) => Some(LifecycleEvent::StartWork),
            OrderCommand::SubmitDelivery(c) => Some(LifecycleEvent::SubmitDelivery {
                message: non_blank(c.message.as_deref()),
            }),
            OrderCommand::RequestRevision(c) => Some(LifecycleEvent::RequestRevision {
                feedback: non_blank(c.feedback.as_deref()),
            }),
            OrderCommand::AcceptDelivery(_) => Some(LifecycleEvent::AcceptDelivery),
            OrderCommand::CancelOrder(c) => Some(LifecycleEvent::Cancel {
                reason: non_blank(c.reason.as_deref()),
            }),
        }
    }
}

/// Event: OrderPlaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub order_id: OrderId,
    pub order_number: OrderNumber,
    pub buyer: UserId,
    pub seller: UserId,
    pub service_id: ServiceId,
    pub service_title: String,
    pub selection: PricedSelection,
    pub requirements: Vec<String>,
    pub notes: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PaymentVerified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentVerified {
    pub order_id: OrderId,
    pub due_date: Option<DateTime<Utc>>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: WorkStarted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkStarted {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DeliverySubmitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverySubmitted {
    pub order_id: OrderId,
    pub message: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RevisionRequested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionRequested {
    pub order_id: OrderId,
    pub feedback: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: DeliveryAccepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAccepted {
    pub order_id: OrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderCancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelled {
    pub order_id: OrderId,
    pub by: Role,
    pub reason: Option<String>,
    pub payment_status: PaymentStatus,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEvent {
    OrderPlaced(OrderPlaced),
    PaymentVerified(PaymentVerified),
    WorkStarted(WorkStarted),
    DeliverySubmitted(DeliverySubmitted),
    RevisionRequested(RevisionRequested),
    DeliveryAccepted(DeliveryAccepted),
    OrderCancelled(OrderCancelled),
}

impl OrderEvent {
    pub fn order_id(&self) -> OrderId {
        match self {
            OrderEvent::OrderPlaced(e) => e.order_id,
            OrderEvent::PaymentVerified(e) => e.order_id,
            OrderEvent::WorkStarted(e) => e.order_id,
            OrderEvent::DeliverySubmitted(e) => e.order_id,
            OrderEvent::RevisionRequested(e) => e.order_id,
            OrderEvent::DeliveryAccepted(e) => e.order_id,
            OrderEvent::OrderCancelled(e) => e.order_id,
        }
    }

    /// Status the order is in once this event is applied.
    pub fn resulting_status(&self) -> OrderStatus {
        match self {
            OrderEvent::OrderPlaced(_) => OrderStatus::PendingPayment,
            OrderEvent::PaymentVerified(_) => OrderStatus::PaymentVerified,
            OrderEvent::WorkStarted(_) => OrderStatus::InProgress,
            OrderEvent::DeliverySubmitted(_) => OrderStatus::Review,
            OrderEvent::RevisionRequested(_) => OrderStatus::RevisionRequested,
            OrderEvent::DeliveryAccepted(_) => OrderStatus::Completed,
            OrderEvent::OrderCancelled(_) => OrderStatus::Cancelled,
        }
    }

    pub fn notification_status(&self) -> NotificationStatus {
        self.resulting_status().notification_status()
    }

    /// Free text carried to recipients (delivery message, feedback, reason).
    pub fn payload(&self) -> Option<&str> {
        match self {
            OrderEvent::DeliverySubmitted(e) => e.message.as_deref(),
            OrderEvent::RevisionRequested(e) => e.feedback.as_deref(),
            OrderEvent::OrderCancelled(e) => e.reason.as_deref(),
            _ => None,
        }
    }
}

impl Event for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "orders.order.placed",
            OrderEvent::PaymentVerified(_) => "orders.order.payment_verified",
            OrderEvent::WorkStarted(_) => "orders.order.work_started",
            OrderEvent::DeliverySubmitted(_) => "orders.order.delivery_submitted",
            OrderEvent::RevisionRequested(_) => "orders.order.revision_requested",
            OrderEvent::DeliveryAccepted(_) => "orders.order.delivery_accepted",
            OrderEvent::OrderCancelled(_) => "orders.order.cancelled",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::OrderPlaced(e) => e.occurred_at,
            OrderEvent::PaymentVerified(e) => e.occurred_at,
            OrderEvent::WorkStarted(e) => e.occurred_at,
            OrderEvent::DeliverySubmitted(e) => e.occurred_at,
            OrderEvent::RevisionRequested(e) => e.occurred_at,
            OrderEvent::DeliveryAccepted(e) => e.occurred_at,
            OrderEvent::OrderCancelled(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Order {
    type Command = OrderCommand;
    type Event = OrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            OrderEvent::OrderPlaced(e) => {
                self.id = e.order_id;
                self.placement = Some(Placement {
                    order_number: e.order_number.clone(),
                    buyer: e.buyer,
                    seller: e.seller,
                    service_id: e.service_id,
                    service_title: e.service_title.clone(),
                    snapshot: e.selection.clone(),
                    requirements: e.requirements.clone(),
                    notes: e.notes.clone(),
                    placed_at: e.occurred_at,
                });
                self.payment_status = PaymentStatus::Pending;
            }
            OrderEvent::PaymentVerified(e) => {
                self.payment_status = PaymentStatus::Verified;
                self.due_date = e.due_date;
            }
            OrderEvent::WorkStarted(_) => {}
            OrderEvent::DeliverySubmitted(e) => {
                self.deliveries.push(DeliveryRecord {
                    message: e.message.clone(),
                    delivered_at: e.occurred_at,
                });
            }
            OrderEvent::RevisionRequested(e) => {
                self.revision_requests.push(RevisionRecord {
                    feedback: e.feedback.clone(),
                    requested_at: e.occurred_at,
                });
            }
            OrderEvent::DeliveryAccepted(_) => {
                self.payment_status = PaymentStatus::PayoutPending;
            }
            OrderEvent::OrderCancelled(e) => {
                self.payment_status = e.payment_status;
                self.cancellation = Some(Cancellation {
                    by: e.by,
                    reason: e.reason.clone(),
                    cancelled_at: e.occurred_at,
                });
            }
        }

        self.status = event.resulting_status();
        self.updated_at = Some(event.occurred_at());

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OrderCommand::PlaceOrder(cmd) => self.handle_place(cmd),
            OrderCommand::VerifyPayment(cmd) => self.handle_verify_payment(cmd),
            OrderCommand::StartWork(cmd) => self.handle_start_work(cmd),
            OrderCommand::SubmitDelivery(cmd) => self.handle_submit_delivery(cmd),
            OrderCommand::RequestRevision(cmd) => self.handle_request_revision(cmd),
            OrderCommand::AcceptDelivery(cmd) => self.handle_accept_delivery(cmd),
            OrderCommand::CancelOrder(cmd) => self.handle_cancel(cmd),
        }
    }
}

impl Order {
    fn ensure_order_id(&self, order_id: OrderId) -> Result<(), DomainError> {
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    /// Guard shared by every lifecycle command: placed, same order, and a
    /// legal move from the current status.
    fn decide(&self, order_id: OrderId, event: &LifecycleEvent) -> Result<Transition, DomainError> {
        if !self.is_placed() {
            return Err(DomainError::not_found());
        }
        self.ensure_order_id(order_id)?;
        transition(self.status, event)
    }

    fn handle_place(&self, cmd: &PlaceOrder) -> Result<Vec<OrderEvent>, DomainError> {
        if self.is_placed() {
            return Err(DomainError::conflict("order already exists"));
        }
        self.ensure_order_id(cmd.order_id)?;

        let requirements: Vec<String> = cmd
            .requirements
            .iter()
            .filter_map(|r| non_blank(Some(r)))
            .collect();
        if requirements.is_empty() {
            return Err(DomainError::validation(
                "order needs at least one non-blank requirement",
            ));
        }

        if cmd.buyer == cmd.seller {
            return Err(DomainError::validation("cannot order your own service"));
        }

        Ok(vec![OrderEvent::OrderPlaced(OrderPlaced {
            order_id: cmd.order_id,
            order_number: cmd.order_number.clone(),
            buyer: cmd.buyer,
            seller: cmd.seller,
            service_id: cmd.service_id,
            service_title: cmd.service_title.clone(),
            selection: cmd.selection.clone(),
            requirements,
            notes: non_blank(cmd.notes.as_deref()),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_verify_payment(&self, cmd: &VerifyPayment) -> Result<Vec<OrderEvent>, DomainError> {
        let transition = self.decide(cmd.order_id, &LifecycleEvent::VerifyPayment)?;

        let due_date = if transition.effects.contains(&SideEffect::SetDueDate) {
            self.placement
                .as_ref()
                .and_then(|p| p.snapshot.delivery)
                .map(|delivery| delivery.due_from(cmd.occurred_at))
        } else {
            None
        };

        Ok(vec![OrderEvent::PaymentVerified(PaymentVerified {
            order_id: cmd.order_id,
            due_date,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_start_work(&self, cmd: &StartWork) -> Result<Vec<OrderEvent>, DomainError> {
        self.decide(cmd.order_id, &LifecycleEvent::StartWork)?;

        Ok(vec![OrderEvent::WorkStarted(WorkStarted {
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_submit_delivery(&self, cmd: &SubmitDelivery) -> Result<Vec<OrderEvent>, DomainError> {
        let message = non_blank(cmd.message.as_deref());
        self.decide(
            cmd.order_id,
            &LifecycleEvent::SubmitDelivery {
                message: message.clone(),
            },
        )?;

        Ok(vec![OrderEvent::DeliverySubmitted(DeliverySubmitted {
            order_id: cmd.order_id,
            message,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_request_revision(
        &self,
        cmd: &RequestRevision,
    ) -> Result<Vec<OrderEvent>, DomainError> {
        let feedback = non_blank(cmd.feedback.as_deref());
        self.decide(
            cmd.order_id,
            &LifecycleEvent::RequestRevision {
                feedback: feedback.clone(),
            },
        )?;

        Ok(vec![OrderEvent::RevisionRequested(RevisionRequested {
            order_id: cmd.order_id,
            feedback,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_accept_delivery(&self, cmd: &AcceptDelivery) -> Result<Vec<OrderEvent>, DomainError> {
        self.decide(cmd.order_id, &LifecycleEvent::AcceptDelivery)?;

        Ok(vec![OrderEvent::DeliveryAccepted(DeliveryAccepted {
            order_id: cmd.order_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_cancel(&self, cmd: &CancelOrder) -> Result<Vec<OrderEvent>, DomainError> {
        let reason = non_blank(cmd.reason.as_deref());
        let transition = self.decide(
            cmd.order_id,
            &LifecycleEvent::Cancel {
                reason: reason.clone(),
            },
        )?;

        let payment_status = transition
            .effects
            .iter()
            .find_map(|effect| match effect {
                SideEffect::SetPaymentStatus { status } => Some(*status),
                _ => None,
            })
            .unwrap_or(self.payment_status);

        Ok(vec![OrderEvent::OrderCancelled(OrderCancelled {
            order_id: cmd.order_id,
            by: cmd.by,
            reason,
            payment_status,
            occurred_at: cmd.occurred_at,
        })])
    }
}

fn non_blank(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use marketplace_catalog::{DeliveryTime, Localized, Package, resolve};
    use marketplace_events::execute;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn test_order_id() -> OrderId {
        OrderId::new(AggregateId::new())
    }

    fn test_service() -> Service {
        Service::new(
            ServiceId::new(AggregateId::new()),
            UserId::new(),
            Localized::new("Logo design".to_string()),
        )
        .with_package(Package::new("Basic", 500, "5 days"))
        .with_package(Package::new("Standard", "$1,000", "3 days").popular())
    }

    fn place_cmd(order_id: OrderId, service: &Service) -> PlaceOrder {
        let selection = resolve(service, None, &Locale::english()).unwrap();
        PlaceOrder::for_service(
            order_id,
            UserId::new(),
            service,
            selection,
            vec!["Brand name: Acme".to_string(), "   ".to_string()],
            Some("  ".to_string()),
            &Locale::english(),
            t0(),
        )
    }

    fn placed_order() -> Order {
        let order_id = test_order_id();
        let mut order = Order::empty(order_id);
        execute(
            &mut order,
            &OrderCommand::PlaceOrder(place_cmd(order_id, &test_service())),
        )
        .unwrap();
        order
    }

    fn verify(order: &Order) -> OrderCommand {
        OrderCommand::VerifyPayment(VerifyPayment {
            order_id: order.id_typed(),
            occurred_at: t0() + Duration::hours(1),
        })
    }

    fn start(order: &Order) -> OrderCommand {
        OrderCommand::StartWork(StartWork {
            order_id: order.id_typed(),
            occurred_at: t0() + Duration::hours(2),
        })
    }

    fn deliver(order: &Order, message: Option<&str>) -> OrderCommand {
        OrderCommand::SubmitDelivery(SubmitDelivery {
            order_id: order.id_typed(),
            message: message.map(str::to_string),
            occurred_at: t0() + Duration::days(2),
        })
    }

    fn revise(order: &Order, feedback: &str) -> OrderCommand {
        OrderCommand::RequestRevision(RequestRevision {
            order_id: order.id_typed(),
            feedback: Some(feedback.to_string()),
            occurred_at: t0() + Duration::days(3),
        })
    }

    fn accept(order: &Order) -> OrderCommand {
        OrderCommand::AcceptDelivery(AcceptDelivery {
            order_id: order.id_typed(),
            occurred_at: t0() + Duration::days(4),
        })
    }

    fn cancel(order: &Order, by: Role) -> OrderCommand {
        OrderCommand::CancelOrder(CancelOrder {
            order_id: order.id_typed(),
            by,
            reason: Some("Changed plans".to_string()),
            occurred_at: t0() + Duration::days(1),
        })
    }

    fn order_in_review() -> Order {
        let mut order = placed_order();
        for cmd in [verify(&order), start(&order), deliver(&order, Some("v1"))] {
            execute(&mut order, &cmd).unwrap();
        }
        order
    }

    #[test]
    fn place_order_snapshots_selection_and_cleans_input() {
        let order = placed_order();
        let placement = order.placement().unwrap();

        assert_eq!(order.status(), OrderStatus::PendingPayment);
        assert_eq!(order.payment_status(), PaymentStatus::Pending);
        assert_eq!(placement.snapshot.package_name, "Standard");
        assert_eq!(order.total().unwrap().amount(), 1000);
        assert_eq!(placement.requirements, vec!["Brand name: Acme".to_string()]);
        assert_eq!(placement.notes, None);
        assert_eq!(placement.service_title, "Logo design");
        assert!(placement.order_number.as_str().starts_with("ORD-20260301-"));
        assert_eq!(order.created_at(), Some(t0()));
        assert_eq!(order.due_date(), None);
        assert_eq!(order.version(), 1);
    }

    #[test]
    fn placing_twice_is_a_conflict() {
        let order = placed_order();
        let cmd = place_cmd(order.id_typed(), &test_service());
        match order.handle(&OrderCommand::PlaceOrder(cmd)) {
            Err(DomainError::Conflict(msg)) => assert!(msg.contains("already exists")),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn placement_requires_a_non_blank_requirement() {
        let order_id = test_order_id();
        let mut cmd = place_cmd(order_id, &test_service());
        cmd.requirements = vec![" ".to_string(), String::new()];
        assert!(matches!(
            Order::empty(order_id).handle(&OrderCommand::PlaceOrder(cmd)),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn buyer_cannot_order_own_service() {
        let order_id = test_order_id();
        let mut cmd = place_cmd(order_id, &test_service());
        cmd.buyer = cmd.seller;
        assert!(matches!(
            Order::empty(order_id).handle(&OrderCommand::PlaceOrder(cmd)),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn lifecycle_commands_on_unplaced_order_are_not_found() {
        let order = Order::empty(test_order_id());
        assert_eq!(order.handle(&verify(&order)), Err(DomainError::NotFound));
    }

    #[test]
    fn mismatched_order_id_is_rejected() {
        let order = placed_order();
        let cmd = OrderCommand::VerifyPayment(VerifyPayment {
            order_id: test_order_id(),
            occurred_at: t0(),
        });
        assert!(matches!(order.handle(&cmd), Err(DomainError::InvariantViolation(_))));
    }

    #[test]
    fn verify_payment_sets_due_date_from_snapshot() {
        let mut order = placed_order();
        let cmd = verify(&order);
        execute(&mut order, &cmd).unwrap();

        assert_eq!(order.status(), OrderStatus::PaymentVerified);
        assert_eq!(order.payment_status(), PaymentStatus::Verified);
        let expected = DeliveryTime::days(3).due_from(t0() + Duration::hours(1));
        assert_eq!(order.due_date(), Some(expected));
    }

    #[test]
    fn full_lifecycle_to_completion() {
        let mut order = order_in_review();
        assert_eq!(order.status(), OrderStatus::Review);
        assert_eq!(order.deliveries().len(), 1);

        let cmd = accept(&order);
        execute(&mut order, &cmd).unwrap();
        assert_eq!(order.status(), OrderStatus::Completed);
        assert_eq!(order.payment_status(), PaymentStatus::PayoutPending);
        assert_eq!(order.version(), 5);
        assert_eq!(order.updated_at(), Some(t0() + Duration::days(4)));
    }

    #[test]
    fn revision_cycle_returns_to_review_with_same_due_date() {
        let mut order = order_in_review();
        let due = order.due_date();

        let cmd = revise(&order, "Bigger logo");
        let revision = execute(&mut order, &cmd).unwrap();
        assert_eq!(order.status(), OrderStatus::RevisionRequested);
        let cmd = deliver(&order, Some("v2"));
        let redelivery = execute(&mut order, &cmd).unwrap();
        assert_eq!(order.status(), OrderStatus::Review);
        assert_eq!(order.due_date(), due);

        let first = order.notifications_for(&revision[0]);
        let second = order.notifications_for(&redelivery[0]);
        assert!(first.iter().all(|n| n.status == NotificationStatus::RevisionRequested));
        assert!(first.iter().all(|n| n.payload.as_deref() == Some("Bigger logo")));
        assert!(second.iter().all(|n| n.status == NotificationStatus::Delivered));
        assert!(second.iter().all(|n| n.payload.as_deref() == Some("v2")));
        assert_eq!(order.revision_requests().len(), 1);
        assert_eq!(order.deliveries().len(), 2);
    }

    #[test]
    fn revisions_are_unbounded() {
        let mut order = order_in_review();
        for round in 0..10 {
            let cmd = revise(&order, &format!("round {round}"));
            execute(&mut order, &cmd).unwrap();
            let cmd = deliver(&order, None);
            execute(&mut order, &cmd).unwrap();
        }
        assert_eq!(order.status(), OrderStatus::Review);
        assert_eq!(order.revision_requests().len(), 10);
    }

    #[test]
    fn invalid_transition_leaves_order_unchanged() {
        let order = placed_order();
        let before = order.clone();

        match order.handle(&accept(&order)) {
            Err(DomainError::InvalidTransition { event, from }) => {
                assert_eq!(event, "accept_delivery");
                assert_eq!(from, "pending_payment");
            }
            other => panic!("expected InvalidTransition, got {other:?}"),
        }

        let mut order = order;
        let cmd = start(&order);
        assert!(execute(&mut order, &cmd).is_err());
        assert_eq!(order, before);
    }

    #[test]
    fn cancel_before_verification_voids_payment() {
        let mut order = placed_order();
        let cmd = cancel(&order, Role::Client);
        execute(&mut order, &cmd).unwrap();

        assert_eq!(order.status(), OrderStatus::Cancelled);
        assert_eq!(order.payment_status(), PaymentStatus::Voided);
        let cancellation = order.cancellation().unwrap();
        assert_eq!(cancellation.by, Role::Client);
        assert_eq!(cancellation.reason.as_deref(), Some("Changed plans"));
    }

    #[test]
    fn cancel_after_verification_requires_refund() {
        let mut order = placed_order();
        let cmd = verify(&order);
        execute(&mut order, &cmd).unwrap();
        let cmd = cancel(&order, Role::Admin);
        execute(&mut order, &cmd).unwrap();
        assert_eq!(order.payment_status(), PaymentStatus::RefundPending);
    }

    #[test]
    fn terminal_orders_reject_cancel() {
        let mut order = order_in_review();
        let cmd = accept(&order);
        execute(&mut order, &cmd).unwrap();
        assert!(matches!(
            order.handle(&cancel(&order, Role::Client)),
            Err(DomainError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn placement_notifies_admin_for_payment_verification() {
        let order_id = test_order_id();
        let mut order = Order::empty(order_id);
        let events = execute(
            &mut order,
            &OrderCommand::PlaceOrder(place_cmd(order_id, &test_service())),
        )
        .unwrap();

        let batch = order.notifications_for(&events[0]);
        let roles: Vec<_> = batch.iter().map(|n| n.recipient).collect();
        assert_eq!(roles, vec![Role::Client, Role::Freelancer, Role::Admin]);
        assert!(batch.iter().all(|n| n.status == NotificationStatus::PendingPayment));
        assert!(batch.iter().all(|n| Some(&n.order_number) == order.order_number()));
    }

    #[test]
    fn completion_batch_has_exactly_three_recipients() {
        let mut order = order_in_review();
        let cmd = accept(&order);
        let events = execute(&mut order, &cmd).unwrap();
        let batch = order.notifications_for(&events[0]);
        assert_eq!(batch.len(), 3);
        assert!(batch.iter().all(|n| n.status == NotificationStatus::Completed));
    }

    #[test]
    fn participants_map_roles_to_users() {
        let order = placed_order();
        let placement = order.placement().unwrap();
        assert_eq!(order.participant(Role::Client), Some(placement.buyer));
        assert_eq!(order.participant(Role::Freelancer), Some(placement.seller));
        assert_eq!(order.participant(Role::Admin), None);
    }

    #[test]
    fn blank_delivery_message_is_dropped() {
        let mut order = placed_order();
        let cmd = verify(&order);
        execute(&mut order, &cmd).unwrap();
        let cmd = start(&order);
        execute(&mut order, &cmd).unwrap();
        let cmd = deliver(&order, Some("   "));
        let events = execute(&mut order, &cmd).unwrap();
        assert_eq!(events[0].payload(), None);
        assert_eq!(order.deliveries()[0].message, None);
    }

    #[test]
    fn snapshot_is_immune_to_later_package_edits() {
        let service = test_service();
        let order_id = test_order_id();
        let mut order = Order::empty(order_id);
        execute(&mut order, &OrderCommand::PlaceOrder(place_cmd(order_id, &service))).unwrap();

        let repriced = service.with_package(Package::new("Express", 9999, "1 day").popular());
        let repriced_selection = resolve(&repriced, Some("Express"), &Locale::english()).unwrap();
        assert_eq!(repriced_selection.price.amount(), 9999);

        let cmd = verify(&order);
        execute(&mut order, &cmd).unwrap();
        assert_eq!(order.total().unwrap().amount(), 1000);
        assert_eq!(order.placement().unwrap().snapshot.package_name, "Standard");
    }

    #[test]
    fn event_types_are_namespaced() {
        let order = order_in_review();
        let events = order.handle(&accept(&order)).unwrap();
        assert_eq!(events[0].event_type(), "orders.order.delivery_accepted");
        assert_eq!(events[0].version(), 1);
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let order = placed_order();
        let before = order.clone();

        let events1 = order.handle(&verify(&order)).unwrap();
        let events2 = order.handle(&verify(&order)).unwrap();

        assert_eq!(order, before);
        assert_eq!(events1, events2);
    }

    #[test]
    fn apply_is_deterministic() {
        let source = order_in_review();
        let order_id = source.id_typed();
        let placement = source.placement().unwrap().clone();

        let events = vec![
            OrderEvent::OrderPlaced(OrderPlaced {
                order_id,
                order_number: placement.order_number.clone(),
                buyer: placement.buyer,
                seller: placement.seller,
                service_id: placement.service_id,
                service_title: placement.service_title.clone(),
                selection: placement.snapshot.clone(),
                requirements: placement.requirements.clone(),
                notes: None,
                occurred_at: t0(),
            }),
            OrderEvent::PaymentVerified(PaymentVerified {
                order_id,
                due_date: Some(t0() + Duration::days(3)),
                occurred_at: t0(),
            }),
            OrderEvent::WorkStarted(WorkStarted {
                order_id,
                occurred_at: t0(),
            }),
        ];

        let mut a = Order::empty(order_id);
        let mut b = Order::empty(order_id);
        for e in &events {
            a.apply(e);
            b.apply(e);
        }

        assert_eq!(a, b);
        assert_eq!(a.status(), OrderStatus::InProgress);
        assert_eq!(a.version(), 3);
    }

    mod proptest_tests {
        use super::*;
        use crate::machine::transition;
        use proptest::prelude::*;

        fn command_for(order: &Order, pick: u8) -> OrderCommand {
            match pick % 6 {
                0 => verify(order),
                1 => start(order),
                2 => deliver(order, Some("files")),
                3 => revise(order, "tweak"),
                4 => accept(order),
                _ => cancel(order, Role::Client),
            }
        }

        proptest! {
            /// Property: every command either follows the transition table or
            /// leaves the order exactly as it was.
            #[test]
            fn commands_follow_table_or_change_nothing(picks in prop::collection::vec(any::<u8>(), 1..40)) {
                let mut order = placed_order();
                for pick in picks {
                    let cmd = command_for(&order, pick);
                    let event = cmd.lifecycle_event().unwrap();
                    let expected = transition(order.status(), &event);
                    let before = order.clone();

                    match execute(&mut order, &cmd) {
                        Ok(events) => {
                            let t = expected.unwrap();
                            prop_assert_eq!(events.len(), 1);
                            prop_assert_eq!(order.status(), t.to);
                            prop_assert_eq!(order.version(), before.version() + 1);
                            prop_assert_eq!(order.total(), before.total());
                            prop_assert_eq!(
                                order.notifications_for(&events[0]).len(),
                                t.notifications().count()
                            );
                        }
                        Err(err) => {
                            prop_assert!(expected.is_err());
                            let is_invalid_transition = matches!(err, DomainError::InvalidTransition { .. });
                            prop_assert!(is_invalid_transition);
                            prop_assert_eq!(&order, &before);
                        }
                    }
                }
            }
        }
    }
}
