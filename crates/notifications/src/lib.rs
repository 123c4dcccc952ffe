//! Order notification rendering.
//!
//! Turns the recipient list of an accepted transition into one rendered
//! message per role. Transmission belongs to a [`NotificationSender`]; nothing
//! in this crate performs IO.

pub mod dispatcher;
pub mod sender;
pub mod template;

pub use dispatcher::{NotificationDispatcher, Recipient, RenderedNotification};
pub use sender::{DeliveryError, LoggingSender, NotificationSender, RecordingSender};
pub use template::{FALLBACK_COPY, StatusCopy, copy_for, lookup, render_url};
