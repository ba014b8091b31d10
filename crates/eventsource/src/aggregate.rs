//! Core aggregate traits.

use crate::command::Command;
use crate::event::{DomainEvent, short_type_name};

/// Trait for aggregates in an event-sourced system.
///
/// An aggregate's current state is a left fold over its events: the
/// repository starts from `Default::default()` and calls [`Aggregate::on`]
/// once per event in ascending version order.
pub trait Aggregate: Default + Send + Sync + Sized {
    /// The type of events this aggregate produces and consumes.
    type Event: DomainEvent;

    /// The type of errors this aggregate can produce.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the aggregate type name.
    ///
    /// Used in diagnostics and by stores that keep aggregates by type.
    fn aggregate_type() -> &'static str {
        short_type_name::<Self>()
    }

    /// Applies an event to the aggregate, updating its state.
    ///
    /// Must be deterministic. Returning an error reports the event as
    /// unhandled; it is never silently skipped.
    fn on(&mut self, event: &Self::Event) -> Result<(), Self::Error>;

    /// Applies multiple events in sequence, stopping at the first failure.
    fn on_all<'a>(
        &mut self,
        events: impl IntoIterator<Item = &'a Self::Event>,
    ) -> Result<(), Self::Error>
    where
        Self::Event: 'a,
    {
        for event in events {
            self.on(event)?;
        }
        Ok(())
    }
}

/// Aggregates that turn commands into events.
pub trait CommandHandler: Aggregate {
    /// The commands this aggregate accepts.
    type Command: Command;

    /// Decides which events a command produces given the current state.
    ///
    /// Returning no events is a valid outcome: nothing is persisted and the
    /// version is unchanged.
    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;
}
