//! Append-only event store boundary.
//!
//! Storage-agnostic abstraction for appending and loading per-order event
//! streams. Publication to the bus is the dispatcher's job and happens only
//! after an append succeeds.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};
