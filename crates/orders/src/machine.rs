//! Order state machine: `(status, event) → (status, side effects)`.
//!
//! Pure and total over its inputs. Anything not in the table is an
//! `InvalidTransition`, and nothing is produced for it.
//!
//! | event              | from                                   | to                 |
//! |--------------------|----------------------------------------|--------------------|
//! | `verify_payment`   | pending_payment                        | payment_verified   |
//! | `start_work`       | payment_verified                       | in_progress        |
//! | `submit_delivery`  | in_progress, revision_requested        | review             |
//! | `request_revision` | review                                 | revision_requested |
//! | `accept_delivery`  | review                                 | completed          |
//! | `cancel`           | any non-terminal                       | cancelled          |

use serde::{Deserialize, Serialize};

use marketplace_core::{DomainError, DomainResult, Role};

use crate::status::{NotificationStatus, OrderStatus, PaymentStatus};

const NON_TERMINAL: &[OrderStatus] = &[
    OrderStatus::PendingPayment,
    OrderStatus::PaymentVerified,
    OrderStatus::InProgress,
    OrderStatus::Review,
    OrderStatus::RevisionRequested,
];

/// A named action that may move an order between statuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    VerifyPayment,
    StartWork,
    SubmitDelivery { message: Option<String> },
    RequestRevision { feedback: Option<String> },
    AcceptDelivery,
    Cancel { reason: Option<String> },
}

impl LifecycleEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::VerifyPayment => "verify_payment",
            LifecycleEvent::StartWork => "start_work",
            LifecycleEvent::SubmitDelivery { .. } => "submit_delivery",
            LifecycleEvent::RequestRevision { .. } => "request_revision",
            LifecycleEvent::AcceptDelivery => "accept_delivery",
            LifecycleEvent::Cancel { .. } => "cancel",
        }
    }

    /// Statuses this event is accepted from.
    pub fn valid_sources(&self) -> &'static [OrderStatus] {
        match self {
            LifecycleEvent::VerifyPayment => &[OrderStatus::PendingPayment],
            LifecycleEvent::StartWork => &[OrderStatus::PaymentVerified],
            LifecycleEvent::SubmitDelivery { .. } => {
                &[OrderStatus::InProgress, OrderStatus::RevisionRequested]
            }
            LifecycleEvent::RequestRevision { .. } | LifecycleEvent::AcceptDelivery => {
                &[OrderStatus::Review]
            }
            LifecycleEvent::Cancel { .. } => NON_TERMINAL,
        }
    }

    fn target(&self) -> OrderStatus {
        match self {
            LifecycleEvent::VerifyPayment => OrderStatus::PaymentVerified,
            LifecycleEvent::StartWork => OrderStatus::InProgress,
            LifecycleEvent::SubmitDelivery { .. } => OrderStatus::Review,
            LifecycleEvent::RequestRevision { .. } => OrderStatus::RevisionRequested,
            LifecycleEvent::AcceptDelivery => OrderStatus::Completed,
            LifecycleEvent::Cancel { .. } => OrderStatus::Cancelled,
        }
    }

    /// Free text forwarded to recipients.
    fn payload(&self) -> Option<String> {
        match self {
            LifecycleEvent::SubmitDelivery { message } => message.clone(),
            LifecycleEvent::RequestRevision { feedback } => feedback.clone(),
            LifecycleEvent::Cancel { reason } => reason.clone(),
            _ => None,
        }
    }
}

/// Effect the caller must carry out for an accepted transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum SideEffect {
    /// Derive the due date from the snapshot delivery time.
    SetDueDate,
    SetPaymentStatus { status: PaymentStatus },
    RecordDelivery,
    RecordRevisionRequest,
    Notify { role: Role, payload: Option<String> },
}

/// An accepted transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub notify: NotificationStatus,
    pub effects: Vec<SideEffect>,
}

impl Transition {
    /// Recipients and payloads of the notification batch, in role order.
    pub fn notifications(&self) -> impl Iterator<Item = (Role, Option<&str>)> + '_ {
        self.effects.iter().filter_map(|effect| match effect {
            SideEffect::Notify { role, payload } => Some((*role, payload.as_deref())),
            _ => None,
        })
    }
}

/// Notify effects for a batch: one per recipient role.
pub fn notify_effects(status: NotificationStatus, payload: Option<&str>) -> Vec<SideEffect> {
    status
        .recipients()
        .iter()
        .map(|role| SideEffect::Notify {
            role: *role,
            payload: payload.map(str::to_string),
        })
        .collect()
}

/// Apply `event` to an order currently in `from`.
pub fn transition(from: OrderStatus, event: &LifecycleEvent) -> DomainResult<Transition> {
    if !event.valid_sources().contains(&from) {
        return Err(DomainError::invalid_transition(event.name(), from.as_str()));
    }

    let to = event.target();
    let mut effects = match event {
        LifecycleEvent::VerifyPayment => vec![
            SideEffect::SetDueDate,
            SideEffect::SetPaymentStatus {
                status: PaymentStatus::Verified,
            },
        ],
        LifecycleEvent::StartWork => vec![],
        LifecycleEvent::SubmitDelivery { .. } => vec![SideEffect::RecordDelivery],
        LifecycleEvent::RequestRevision { .. } => vec![SideEffect::RecordRevisionRequest],
        LifecycleEvent::AcceptDelivery => vec![SideEffect::SetPaymentStatus {
            status: PaymentStatus::PayoutPending,
        }],
        LifecycleEvent::Cancel { .. } => {
            let status = if from == OrderStatus::PendingPayment {
                PaymentStatus::Voided
            } else {
                PaymentStatus::RefundPending
            };
            vec![SideEffect::SetPaymentStatus { status }]
        }
    };

    let notify = to.notification_status();
    effects.extend(notify_effects(notify, event.payload().as_deref()));

    Ok(Transition {
        from,
        to,
        notify,
        effects,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_events() -> Vec<LifecycleEvent> {
        vec![
            LifecycleEvent::VerifyPayment,
            LifecycleEvent::StartWork,
            LifecycleEvent::SubmitDelivery { message: None },
            LifecycleEvent::RequestRevision { feedback: None },
            LifecycleEvent::AcceptDelivery,
            LifecycleEvent::Cancel { reason: None },
        ]
    }

    fn expected(from: OrderStatus, event: &LifecycleEvent) -> Option<OrderStatus> {
        use OrderStatus::*;
        match (event, from) {
            (LifecycleEvent::VerifyPayment, PendingPayment) => Some(PaymentVerified),
            (LifecycleEvent::StartWork, PaymentVerified) => Some(InProgress),
            (LifecycleEvent::SubmitDelivery { .. }, InProgress | RevisionRequested) => Some(Review),
            (LifecycleEvent::RequestRevision { .. }, Review) => Some(RevisionRequested),
            (LifecycleEvent::AcceptDelivery, Review) => Some(Completed),
            (
                LifecycleEvent::Cancel { .. },
                PendingPayment | PaymentVerified | InProgress | Review | RevisionRequested,
            ) => Some(Cancelled),
            _ => None,
        }
    }

    #[test]
    fn every_pair_matches_the_table() {
        for from in OrderStatus::ALL {
            for event in all_events() {
                match (transition(from, &event), expected(from, &event)) {
                    (Ok(t), Some(to)) => {
                        assert_eq!(t.from, from);
                        assert_eq!(t.to, to, "{} from {from}", event.name());
                    }
                    (Err(DomainError::InvalidTransition { event: name, from: state }), None) => {
                        assert_eq!(name, event.name());
                        assert_eq!(state, from.as_str());
                    }
                    (got, want) => panic!("{} from {from}: got {got:?}, want {want:?}", event.name()),
                }
            }
        }
    }

    #[test]
    fn cancel_reachable_from_every_non_terminal_state_only() {
        let cancel = LifecycleEvent::Cancel { reason: None };
        for from in OrderStatus::ALL {
            assert_eq!(transition(from, &cancel).is_ok(), !from.is_terminal(), "{from}");
        }
    }

    #[test]
    fn terminal_states_accept_nothing() {
        for from in [OrderStatus::Completed, OrderStatus::Cancelled] {
            for event in all_events() {
                assert!(transition(from, &event).is_err());
            }
        }
    }

    #[test]
    fn verify_payment_sets_due_date_and_payment() {
        let t = transition(OrderStatus::PendingPayment, &LifecycleEvent::VerifyPayment).unwrap();
        assert!(t.effects.contains(&SideEffect::SetDueDate));
        assert!(t.effects.contains(&SideEffect::SetPaymentStatus {
            status: PaymentStatus::Verified
        }));
        assert_eq!(t.notify, NotificationStatus::PaymentVerified);
    }

    #[test]
    fn submit_delivery_emits_delivered_batch_with_message() {
        let event = LifecycleEvent::SubmitDelivery {
            message: Some("Final files attached".to_string()),
        };
        let t = transition(OrderStatus::RevisionRequested, &event).unwrap();
        assert_eq!(t.to, OrderStatus::Review);
        assert_eq!(t.notify, NotificationStatus::Delivered);

        let batch: Vec<_> = t.notifications().collect();
        assert_eq!(
            batch,
            vec![
                (Role::Client, Some("Final files attached")),
                (Role::Freelancer, Some("Final files attached")),
            ]
        );
    }

    #[test]
    fn completion_notifies_all_three_roles() {
        let t = transition(OrderStatus::Review, &LifecycleEvent::AcceptDelivery).unwrap();
        let roles: Vec<_> = t.notifications().map(|(role, _)| role).collect();
        assert_eq!(roles, vec![Role::Client, Role::Freelancer, Role::Admin]);
        assert!(t.effects.contains(&SideEffect::SetPaymentStatus {
            status: PaymentStatus::PayoutPending
        }));
    }

    #[test]
    fn cancel_payment_outcome_depends_on_verification() {
        let cancel = LifecycleEvent::Cancel { reason: None };
        let before = transition(OrderStatus::PendingPayment, &cancel).unwrap();
        assert!(before.effects.contains(&SideEffect::SetPaymentStatus {
            status: PaymentStatus::Voided
        }));
        let after = transition(OrderStatus::InProgress, &cancel).unwrap();
        assert!(after.effects.contains(&SideEffect::SetPaymentStatus {
            status: PaymentStatus::RefundPending
        }));
    }

    #[test]
    fn lifecycle_event_serde_shape() {
        let json = serde_json::to_value(LifecycleEvent::RequestRevision {
            feedback: Some("Bigger logo".to_string()),
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "event": "request_revision", "feedback": "Bigger logo" })
        );
    }
}
