//! Role-specific notification copy.
//!
//! One explicit `(status, role)` table. Pairs missing from it render with
//! [`FALLBACK_COPY`], so a lookup always yields something displayable.

use marketplace_core::Role;
use marketplace_orders::NotificationStatus;

/// Copy for one `(status, role)` pair.
///
/// `action_url` is a path template; `{order_id}` and `{order_number}` are
/// substituted at render time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCopy {
    pub label: &'static str,
    pub description: &'static str,
    pub action_url: &'static str,
}

/// Neutral copy for pairs the table does not cover.
pub const FALLBACK_COPY: StatusCopy = StatusCopy {
    label: "Status Updated",
    description: "The status of this order has changed. Open the order to see the latest details.",
    action_url: "/orders/{order_id}",
};

const CLIENT_ORDER: &str = "/orders/{order_id}";
const FREELANCER_ORDER: &str = "/dashboard/orders/{order_id}";

/// Table entry for `(status, role)`, if there is one.
pub fn copy_for(status: NotificationStatus, role: Role) -> Option<&'static StatusCopy> {
    use NotificationStatus as S;

    let copy: &'static StatusCopy = match (status, role) {
        (S::PendingPayment, Role::Client) => &StatusCopy {
            label: "Order Placed",
            description: "Your order was placed and is waiting for payment verification.",
            action_url: CLIENT_ORDER,
        },
        (S::PendingPayment, Role::Freelancer) => &StatusCopy {
            label: "New Order Received",
            description: "A client ordered your service. Work can start once the payment is verified.",
            action_url: FREELANCER_ORDER,
        },
        (S::PendingPayment, Role::Admin) => &StatusCopy {
            label: "Payment Verification Needed",
            description: "A new order is waiting for its payment to be verified.",
            action_url: "/admin/orders/{order_id}/payment",
        },
        (S::PaymentVerified, Role::Client) => &StatusCopy {
            label: "Payment Confirmed",
            description: "Your payment was verified. The freelancer has been asked to start work.",
            action_url: CLIENT_ORDER,
        },
        (S::PaymentVerified, Role::Freelancer) => &StatusCopy {
            label: "Ready to Start",
            description: "Payment for this order was verified. Start work to begin the delivery countdown.",
            action_url: FREELANCER_ORDER,
        },
        (S::InProgress, Role::Client) => &StatusCopy {
            label: "Work Started",
            description: "The freelancer started working on your order.",
            action_url: CLIENT_ORDER,
        },
        (S::InProgress, Role::Freelancer) => &StatusCopy {
            label: "Order In Progress",
            description: "You started this order. Submit your delivery before the due date.",
            action_url: FREELANCER_ORDER,
        },
        (S::Delivered, Role::Client) => &StatusCopy {
            label: "Delivery Ready for Review",
            description: "The freelancer submitted a delivery. Accept it or request a revision.",
            action_url: "/orders/{order_id}/review",
        },
        (S::Delivered, Role::Freelancer) => &StatusCopy {
            label: "Delivery Submitted",
            description: "Your delivery was sent to the client for review.",
            action_url: FREELANCER_ORDER,
        },
        (S::RevisionRequested, Role::Client) => &StatusCopy {
            label: "Revision Requested",
            description: "Your revision request was sent to the freelancer.",
            action_url: CLIENT_ORDER,
        },
        (S::RevisionRequested, Role::Freelancer) => &StatusCopy {
            label: "Client Requested Changes",
            description: "The client asked for a revision. Review the feedback and submit an updated delivery.",
            action_url: FREELANCER_ORDER,
        },
        (S::Completed, Role::Client) => &StatusCopy {
            label: "Order Successfully Completed",
            description: "You accepted the delivery. Thank you for your order.",
            action_url: CLIENT_ORDER,
        },
        (S::Completed, Role::Freelancer) => &StatusCopy {
            label: "Client Accepted Your Delivery",
            description: "The client accepted your delivery. Your payout is being processed.",
            action_url: FREELANCER_ORDER,
        },
        (S::Completed, Role::Admin) => &StatusCopy {
            label: "Verification Needed",
            description: "An order was completed. Verify it and release the payout to the freelancer.",
            action_url: "/admin/orders/{order_id}/payout",
        },
        (S::Cancelled, Role::Client) => &StatusCopy {
            label: "Order Cancelled",
            description: "This order was cancelled.",
            action_url: CLIENT_ORDER,
        },
        (S::Cancelled, Role::Freelancer) => &StatusCopy {
            label: "Order Cancelled",
            description: "This order was cancelled. No further work is needed.",
            action_url: FREELANCER_ORDER,
        },
        _ => return None,
    };

    Some(copy)
}

/// Copy for `(status, role)`, falling back to [`FALLBACK_COPY`].
pub fn lookup(status: NotificationStatus, role: Role) -> &'static StatusCopy {
    copy_for(status, role).unwrap_or(&FALLBACK_COPY)
}

/// Expand an action URL template against `base_url`.
pub fn render_url(template: &str, base_url: &str, order_id: &str, order_number: &str) -> String {
    let path = template
        .replace("{order_id}", order_id)
        .replace("{order_number}", order_number);
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_scheduled_recipient_has_specific_copy() {
        for status in NotificationStatus::ALL {
            for role in status.recipients() {
                assert!(copy_for(status, *role).is_some(), "missing copy for {status}/{role}");
            }
        }
    }

    #[test]
    fn completed_copy_differs_per_role() {
        assert_eq!(
            lookup(NotificationStatus::Completed, Role::Client).label,
            "Order Successfully Completed"
        );
        assert_eq!(
            lookup(NotificationStatus::Completed, Role::Freelancer).label,
            "Client Accepted Your Delivery"
        );
        assert_eq!(
            lookup(NotificationStatus::Completed, Role::Admin).label,
            "Verification Needed"
        );
    }

    #[test]
    fn unknown_pair_falls_back_to_neutral_copy() {
        let copy = lookup(NotificationStatus::InProgress, Role::Admin);
        assert_eq!(copy, &FALLBACK_COPY);
        assert!(!copy.label.is_empty());
        assert!(!copy.description.is_empty());
    }

    #[test]
    fn no_entry_is_blank() {
        for status in NotificationStatus::ALL {
            for role in Role::ALL {
                let copy = lookup(status, role);
                assert!(!copy.label.trim().is_empty());
                assert!(!copy.description.trim().is_empty());
                assert!(copy.action_url.starts_with('/'));
            }
        }
    }

    #[test]
    fn url_templates_expand_against_base() {
        assert_eq!(
            render_url("/orders/{order_id}?ref={order_number}", "https://example.test/", "42", "ORD-1"),
            "https://example.test/orders/42?ref=ORD-1"
        );
    }
}
