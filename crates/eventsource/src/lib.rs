//! Event-sourced domain objects.
//!
//! An aggregate's state is never stored directly; it is rebuilt by folding
//! its events in version order. This crate provides:
//!
//! - [`Event`], [`EventKind`] and [`DomainEvent`]: the event contract
//! - [`Aggregate`] and [`CommandHandler`]: folding events and turning
//!   commands into new ones
//! - [`Serializer`] and [`JsonSerializer`]: the event type registry
//! - [`Repository`]: loading, saving and applying commands over any
//!   [`EventStore`]
//! - [`scenario`]: given/when/then checks for command handlers

pub mod aggregate;
pub mod command;
pub mod error;
pub mod event;
pub mod observer;
pub mod repository;
pub mod scenario;
pub mod serializer;

#[cfg(test)]
mod testing;

pub use aggregate::{Aggregate, CommandHandler};
pub use command::{Command, CommandModel};
pub use common::AggregateId;
pub use error::{BoxError, DomainError, ErrorKind, SerializerError, is_not_found, kind_of};
pub use event::{DomainEvent, Event, EventKind, EventModel, short_type_name};
pub use event_store::{
    AggregateSaver, EventStore, EventStoreError, EventStoreExt, History, InMemoryEventStore,
    PostgresEventStore, Record, Version, VersionRange,
};
pub use observer::EventObserver;
pub use repository::{Repository, RepositoryBuilder};
pub use scenario::Scenario;
pub use serializer::{JsonSerializer, JsonSerializerBuilder, Serializer};
