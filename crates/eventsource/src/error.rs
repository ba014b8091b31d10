//! Error types and classification.
//!
//! Every failure maps to an [`ErrorKind`] that survives wrapping: callers
//! test the kind of the outermost error, however many layers sit on top of
//! the original cause.

use std::error::Error as StdError;

use common::AggregateId;
use event_store::EventStoreError;
use thiserror::Error;

/// Boxed error used for failures raised by aggregate code.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Classification of the failures this crate produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An event or aggregate could not be encoded or decoded.
    InvalidEncoding,
    /// A record names an event type that was never registered.
    UnboundEventType,
    /// No history exists for the aggregate.
    AggregateNotFound,
    /// The aggregate rejected an event it was asked to fold.
    UnhandledEvent,
}

/// Errors raised by a [`Serializer`](crate::Serializer).
#[derive(Debug, Error)]
pub enum SerializerError {
    /// The payload codec rejected the value or the bytes.
    #[error("invalid encoding{}: {source}", describe(.event_type))]
    InvalidEncoding {
        event_type: Option<String>,
        #[source]
        source: serde_json::Error,
    },

    /// The record's type tag is not in the registry.
    #[error("unbound event type: {0}")]
    UnboundEventType(String),
}

fn describe(event_type: &Option<String>) -> String {
    event_type
        .as_deref()
        .map(|t| format!(" for event {t}"))
        .unwrap_or_default()
}

impl SerializerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SerializerError::InvalidEncoding { .. } => ErrorKind::InvalidEncoding,
            SerializerError::UnboundEventType(_) => ErrorKind::UnboundEventType,
        }
    }
}

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the event store.
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    /// An event could not be encoded or decoded.
    #[error(transparent)]
    Serializer(#[from] SerializerError),

    /// Aggregate not found.
    #[error("unable to load {aggregate_type} {aggregate_id}: aggregate not found")]
    AggregateNotFound {
        aggregate_type: &'static str,
        aggregate_id: AggregateId,
    },

    /// The aggregate failed to fold an event.
    #[error("aggregate {aggregate_id} was unable to handle event {event_type}: {source}")]
    UnhandledEvent {
        aggregate_id: AggregateId,
        event_type: String,
        #[source]
        source: BoxError,
    },

    /// The command cannot be applied at all.
    #[error("invalid command: {0}")]
    InvalidCommand(&'static str),

    /// The aggregate's command handler refused the command.
    #[error(transparent)]
    Rejected(BoxError),

    /// The folded aggregate could not be encoded for an aggregate-saving store.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    /// Classifies this error, looking through a rejected command's cause.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            DomainError::EventStore(e) => store_kind(e),
            DomainError::Serializer(e) => Some(e.kind()),
            DomainError::AggregateNotFound { .. } => Some(ErrorKind::AggregateNotFound),
            DomainError::UnhandledEvent { .. } => Some(ErrorKind::UnhandledEvent),
            DomainError::InvalidCommand(_) => None,
            DomainError::Rejected(cause) => kind_of(cause.as_ref()),
            DomainError::Serialization(_) => Some(ErrorKind::InvalidEncoding),
        }
    }

    /// Returns true if this error reports a missing aggregate.
    pub fn is_not_found(&self) -> bool {
        self.kind() == Some(ErrorKind::AggregateNotFound)
    }

    /// Returns the handler's own error if the command was rejected with an
    /// error of type `E`.
    pub fn rejection<E: StdError + 'static>(&self) -> Option<&E> {
        match self {
            DomainError::Rejected(cause) => cause.downcast_ref::<E>(),
            _ => None,
        }
    }
}

fn store_kind(err: &EventStoreError) -> Option<ErrorKind> {
    match err {
        EventStoreError::AggregateNotFound(_) => Some(ErrorKind::AggregateNotFound),
        EventStoreError::Serialization(_) => Some(ErrorKind::InvalidEncoding),
        _ => None,
    }
}

/// Walks the `source()` chain of `err` and returns the first known
/// classification.
pub fn kind_of(err: &(dyn StdError + 'static)) -> Option<ErrorKind> {
    let mut current = Some(err);
    while let Some(e) = current {
        let kind = if let Some(e) = e.downcast_ref::<DomainError>() {
            e.kind()
        } else if let Some(e) = e.downcast_ref::<SerializerError>() {
            Some(e.kind())
        } else if let Some(e) = e.downcast_ref::<EventStoreError>() {
            store_kind(e)
        } else {
            None
        };
        if kind.is_some() {
            return kind;
        }
        current = e.source();
    }
    None
}

/// Returns true if `err`, or anything it wraps, reports a missing aggregate.
pub fn is_not_found(err: &(dyn StdError + 'static)) -> bool {
    kind_of(err) == Some(ErrorKind::AggregateNotFound)
}
