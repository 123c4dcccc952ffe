//! Order lifecycle domain module (event-sourced).
//!
//! Business rules for marketplace orders, implemented purely as deterministic
//! domain logic (no IO, no HTTP, no storage). `machine` holds the transition
//! table; `order` is the aggregate that applies it.

pub mod machine;
pub mod number;
pub mod order;
pub mod status;

pub use machine::{LifecycleEvent, SideEffect, Transition, notify_effects, transition};
pub use number::OrderNumber;
pub use order::{
    AcceptDelivery, CancelOrder, Cancellation, DeliveryAccepted, DeliveryRecord,
    DeliverySubmitted, NotificationEvent, Order, OrderCancelled, OrderCommand, OrderEvent,
    OrderId, OrderPlaced, PaymentVerified, PlaceOrder, Placement, RequestRevision, RevisionRecord,
    RevisionRequested, StartWork, SubmitDelivery, VerifyPayment, WorkStarted,
};
pub use status::{NotificationStatus, OrderStatus, PaymentStatus};
