use serde::{Deserialize, Serialize};

use marketplace_core::Role;

/// Order status lifecycle.
///
/// ```text
/// pending_payment → payment_verified → in_progress → review → completed
///                                                      ↕
///                                              revision_requested
/// (any non-terminal) → cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    PendingPayment,
    PaymentVerified,
    InProgress,
    Review,
    RevisionRequested,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::PendingPayment,
        OrderStatus::PaymentVerified,
        OrderStatus::InProgress,
        OrderStatus::Review,
        OrderStatus::RevisionRequested,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::PendingPayment => "pending_payment",
            OrderStatus::PaymentVerified => "payment_verified",
            OrderStatus::InProgress => "in_progress",
            OrderStatus::Review => "review",
            OrderStatus::RevisionRequested => "revision_requested",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Notification batch emitted when an order enters this status.
    ///
    /// `review` is only ever entered through a delivery, so entering it emits
    /// the delivered batch.
    pub fn notification_status(self) -> NotificationStatus {
        match self {
            OrderStatus::PendingPayment => NotificationStatus::PendingPayment,
            OrderStatus::PaymentVerified => NotificationStatus::PaymentVerified,
            OrderStatus::InProgress => NotificationStatus::InProgress,
            OrderStatus::Review => NotificationStatus::Delivered,
            OrderStatus::RevisionRequested => NotificationStatus::RevisionRequested,
            OrderStatus::Completed => NotificationStatus::Completed,
            OrderStatus::Cancelled => NotificationStatus::Cancelled,
        }
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment tracking, independent of the fulfillment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Awaiting admin verification of the buyer's payment.
    Pending,
    Verified,
    /// Work accepted; admin must release funds to the freelancer.
    PayoutPending,
    /// Cancelled after verification; admin must refund the buyer.
    RefundPending,
    /// Cancelled before any payment was verified.
    Voided,
}

/// Key of a notification batch: the status the order just entered, with
/// `delivered` standing in for the hand-off into `review`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    PendingPayment,
    PaymentVerified,
    InProgress,
    Delivered,
    RevisionRequested,
    Completed,
    Cancelled,
}

impl NotificationStatus {
    pub const ALL: [NotificationStatus; 7] = [
        NotificationStatus::PendingPayment,
        NotificationStatus::PaymentVerified,
        NotificationStatus::InProgress,
        NotificationStatus::Delivered,
        NotificationStatus::RevisionRequested,
        NotificationStatus::Completed,
        NotificationStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NotificationStatus::PendingPayment => "pending_payment",
            NotificationStatus::PaymentVerified => "payment_verified",
            NotificationStatus::InProgress => "in_progress",
            NotificationStatus::Delivered => "delivered",
            NotificationStatus::RevisionRequested => "revision_requested",
            NotificationStatus::Completed => "completed",
            NotificationStatus::Cancelled => "cancelled",
        }
    }

    /// Roles that receive this batch. Admins only hear about payments that
    /// need verification and completed work that needs a payout.
    pub fn recipients(self) -> &'static [Role] {
        match self {
            NotificationStatus::PendingPayment | NotificationStatus::Completed => {
                &[Role::Client, Role::Freelancer, Role::Admin]
            }
            _ => &[Role::Client, Role::Freelancer],
        }
    }
}

impl core::fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
