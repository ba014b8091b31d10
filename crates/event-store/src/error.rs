use thiserror::Error;

use crate::{AggregateId, Version};

/// Errors that can occur when interacting with the event store.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// No record has ever been saved for the aggregate.
    #[error("no aggregate found with id {0}")]
    AggregateNotFound(AggregateId),

    /// The store refused a record because its version is already taken.
    #[error("version {version} already exists for aggregate {aggregate_id}")]
    ConcurrencyConflict {
        aggregate_id: AggregateId,
        version: Version,
    },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EventStoreError {
    /// Returns true if this error reports a missing aggregate.
    pub fn is_not_found(&self) -> bool {
        matches!(self, EventStoreError::AggregateNotFound(_))
    }
}

/// Result type for event store operations.
pub type Result<T> = std::result::Result<T, EventStoreError>;
