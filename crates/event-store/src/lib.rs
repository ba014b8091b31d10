//! Ordered, append-only persistence of encoded events.
//!
//! A store holds one [`History`] per aggregate identity: a list of
//! [`Record`]s kept in ascending [`Version`] order. Stores know nothing about
//! the events inside the records; decoding belongs to the serializer.

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod range;
pub mod snapshot;
pub mod store;

pub use common::AggregateId;
pub use error::{EventStoreError, Result};
pub use event::{History, Record, Version};
pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use range::VersionRange;
pub use snapshot::{AggregateSnapshot, SaveAggregateInput};
pub use store::{AggregateSaver, EventStore, EventStoreExt};
