//! Infrastructure layer: event store, command pipeline, order lifecycle
//! service, catalog access, notification outbox, configuration.

pub mod catalog_store;
pub mod command_dispatcher;
pub mod config;
pub mod event_store;
pub mod lifecycle;
pub mod locks;
pub mod outbox;


pub use catalog_store::{InMemoryServiceCatalog, ServiceCatalog};
pub use command_dispatcher::{CommandDispatcher, Committed, DispatchError};
pub use config::{ConfigError, MarketplaceConfig};
pub use event_store::{EventStore, EventStoreError, InMemoryEventStore, StoredEvent, UncommittedEvent};
pub use lifecycle::{LifecycleOutcome, ORDER_AGGREGATE_TYPE, OrderLifecycle, PlaceOrderRequest};
pub use locks::OrderLocks;
pub use outbox::{Outbox, OutboxEntry, OutboxStatus, RetryReport};
