//! Command execution pipeline (application-level orchestration).
//!
//! ```text
//! Command
//!   ↓  (per-aggregate lock held from here)
//! 1. Load events from store
//!   ↓
//! 2. Rehydrate aggregate (apply historical events)
//!   ↓
//! 3. Handle command (pure decision, produces events)
//!   ↓
//! 4. Append to store (ExpectedVersion::Exact)
//!   ↓  (lock released)
//! 5. Publish committed events to the bus
//! ```
//!
//! Holding the aggregate lock across load → decide → append means two racing
//! commands on one order are decided one after the other: the second one sees
//! the first one's events and is judged against the new state. The exact
//! version check on append stays in place for stores shared across processes.
//!
//! This module contains no IO itself; it composes infrastructure traits.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use marketplace_core::{Aggregate, AggregateId, DomainError, ExpectedVersion};
use marketplace_events::{EventBus, EventEnvelope};

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};
use crate::locks::OrderLocks;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Optimistic concurrency failure, or a domain-level conflict.
    #[error("conflict: {0}")]
    Concurrency(String),
    /// The event is not accepted from the aggregate's current state.
    #[error("invalid transition: cannot {event} while order is {from}")]
    InvalidTransition {
        event: &'static str,
        from: &'static str,
    },
    /// Pricing had nothing to price.
    #[error("invalid service: {0}")]
    InvalidService(String),
    /// Domain validation failure (deterministic).
    #[error("validation failed: {0}")]
    Validation(String),
    /// Domain invariant failure (deterministic).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
    #[error("not found")]
    NotFound,
    /// Stored payloads could not be read back as the aggregate's event type.
    #[error("failed to deserialize stored event: {0}")]
    Deserialize(String),
    #[error(transparent)]
    Store(EventStoreError),
    /// The per-aggregate lock could not be taken.
    #[error("lock failure: {0}")]
    Lock(String),
}

impl DispatchError {
    /// Whether the caller should surface this as a user-facing conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            DispatchError::Concurrency(_) | DispatchError::InvalidTransition { .. }
        )
    }
}

impl From<EventStoreError> for DispatchError {
    fn from(value: EventStoreError) -> Self {
        match value {
            EventStoreError::Concurrency(msg) => DispatchError::Concurrency(msg),
            other => DispatchError::Store(other),
        }
    }
}

impl From<DomainError> for DispatchError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => DispatchError::Validation(msg),
            DomainError::InvariantViolation(msg) => DispatchError::InvariantViolation(msg),
            DomainError::Conflict(msg) => DispatchError::Concurrency(msg),
            DomainError::NotFound => DispatchError::NotFound,
            DomainError::InvalidId(msg) => DispatchError::Validation(msg),
            DomainError::InvalidService(msg) => DispatchError::InvalidService(msg),
            DomainError::InvalidTransition { event, from } => {
                DispatchError::InvalidTransition { event, from }
            }
        }
    }
}

/// A command that went through: the aggregate after applying the new events,
/// the typed events, and their stored form.
#[derive(Debug, Clone)]
pub struct Committed<A: Aggregate> {
    pub aggregate: A,
    pub events: Vec<A::Event>,
    pub stored: Vec<StoredEvent>,
    /// Set when the bus refused at least one of `stored`. The events are
    /// committed regardless.
    pub publish_error: Option<String>,
}

/// Reusable command execution engine for event-sourced aggregates.
///
/// Events are appended before they are published; if append fails nothing is
/// published. Once an append succeeds the command is committed: a publish
/// failure is reported on [`Committed::publish_error`], never as an `Err`.
#[derive(Debug)]
pub struct CommandDispatcher<S, B> {
    store: S,
    bus: B,
    locks: OrderLocks,
}

impl<S, B> CommandDispatcher<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self {
            store,
            bus,
            locks: OrderLocks::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn into_parts(self) -> (S, B) {
        (self.store, self.bus)
    }
}

impl<S, B> CommandDispatcher<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Dispatch a command and return the committed stored events.
    pub fn dispatch<A>(
        &self,
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        command: A::Command,
        make_aggregate: impl FnOnce(AggregateId) -> A,
    ) -> Result<Vec<StoredEvent>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: marketplace_events::Event + Serialize + DeserializeOwned,
    {
        self.execute(aggregate_id, aggregate_type, command, make_aggregate)
            .map(|committed| committed.stored)
    }

    /// Dispatch a command and return the updated aggregate with its new events.
    pub fn execute<A>(
        &self,
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        command: A::Command,
        make_aggregate: impl FnOnce(AggregateId) -> A,
    ) -> Result<Committed<A>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: marketplace_events::Event + Serialize + DeserializeOwned,
    {
        let aggregate_type = aggregate_type.into();

        let mut committed = self
            .locks
            .with_lock(aggregate_id, || {
                self.decide_and_append(aggregate_id, &aggregate_type, &command, make_aggregate)
            })
            .map_err(DispatchError::Lock)??;

        for stored in &committed.stored {
            if let Err(e) = self.bus.publish(stored.to_envelope()) {
                tracing::warn!(
                    aggregate_id = %aggregate_id,
                    event_type = %stored.event_type,
                    sequence_number = stored.sequence_number,
                    error = ?e,
                    "event committed but not published"
                );
                committed.publish_error.get_or_insert_with(|| format!("{e:?}"));
            }
        }

        Ok(committed)
    }

    /// Rehydrate an aggregate from its stream without running a command.
    pub fn load<A>(
        &self,
        aggregate_id: AggregateId,
        make_aggregate: impl FnOnce(AggregateId) -> A,
    ) -> Result<A, DispatchError>
    where
        A: Aggregate,
        A::Event: DeserializeOwned,
    {
        let history = self.store.load_stream(aggregate_id)?;
        validate_loaded_stream(aggregate_id, &history)?;

        let mut aggregate = make_aggregate(aggregate_id);
        apply_history::<A>(&mut aggregate, &history)?;
        Ok(aggregate)
    }

    fn decide_and_append<A>(
        &self,
        aggregate_id: AggregateId,
        aggregate_type: &str,
        command: &A::Command,
        make_aggregate: impl FnOnce(AggregateId) -> A,
    ) -> Result<Committed<A>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: marketplace_events::Event + Serialize + DeserializeOwned,
    {
        // 1) Load history
        let history = self.store.load_stream(aggregate_id)?;
        validate_loaded_stream(aggregate_id, &history)?;
        let expected = ExpectedVersion::Exact(stream_version(&history));

        // 2) Rehydrate aggregate
        let mut aggregate = make_aggregate(aggregate_id);
        apply_history::<A>(&mut aggregate, &history)?;

        // 3) Decide events (no mutation)
        let decided = aggregate.handle(command)?;
        if decided.is_empty() {
            return Ok(Committed {
                aggregate,
                events: vec![],
                stored: vec![],
                publish_error: None,
            });
        }

        // 4) Persist (append-only, optimistic)
        let uncommitted = decided
            .iter()
            .map(|ev| UncommittedEvent::from_typed(aggregate_id, aggregate_type, Uuid::now_v7(), ev))
            .collect::<Result<Vec<_>, _>>()?;

        let stored = self.store.append(uncommitted, expected)?;

        for ev in &decided {
            aggregate.apply(ev);
        }

        Ok(Committed {
            aggregate,
            events: decided,
            stored,
            publish_error: None,
        })
    }
}

fn stream_version(stream: &[StoredEvent]) -> u64 {
    stream.last().map(|e| e.sequence_number).unwrap_or(0)
}

fn validate_loaded_stream(aggregate_id: AggregateId, stream: &[StoredEvent]) -> Result<(), DispatchError> {
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.aggregate_id != aggregate_id {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(format!(
                "loaded stream contains wrong aggregate_id at index {idx}"
            ))));
        }
        if e.sequence_number <= last {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(format!(
                "non-monotonic sequence_number in loaded stream (last={last}, found={})",
                e.sequence_number
            ))));
        }
        last = e.sequence_number;
    }
    Ok(())
}

fn apply_history<A>(aggregate: &mut A, history: &[StoredEvent]) -> Result<(), DispatchError>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
{
    for stored in history {
        let ev: A::Event = serde_json::from_value(stored.payload.clone())
            .map_err(|e| DispatchError::Deserialize(e.to_string()))?;
        aggregate.apply(&ev);
    }

    Ok(())
}
