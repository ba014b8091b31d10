//! Shared types for the event-sourcing workspace.

mod types;

pub use types::AggregateId;
