//! Command contract.

use common::AggregateId;
use serde::{Deserialize, Serialize};

/// Base for commands: the identity of the targeted aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommandModel {
    pub id: AggregateId,
}

impl CommandModel {
    pub fn new(id: impl Into<AggregateId>) -> Self {
        Self { id: id.into() }
    }
}

/// Trait for commands that can be applied to an aggregate.
///
/// Commands represent an intention to perform an action. They may be
/// rejected if the aggregate's current state doesn't allow the action, and
/// are never persisted.
pub trait Command: Send + Sync {
    /// Returns the ID of the aggregate this command targets.
    fn aggregate_id(&self) -> &AggregateId;
}

impl Command for CommandModel {
    fn aggregate_id(&self) -> &AggregateId {
        &self.id
    }
}
