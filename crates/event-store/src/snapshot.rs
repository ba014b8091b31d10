use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{AggregateId, Record, Version};

/// Everything a store needs to persist an aggregate together with the
/// records that produced it.
///
/// `state` is the aggregate after every new event has been applied.
#[derive(Debug, Clone)]
pub struct SaveAggregateInput {
    pub aggregate_id: AggregateId,

    /// The type of aggregate (e.g., "Order").
    pub aggregate_type: String,

    /// Version of the last applied event.
    pub version: Version,

    /// The folded aggregate state as JSON.
    pub state: serde_json::Value,

    /// Type tags of the new events, in generation order.
    pub event_types: Vec<String>,

    /// The encoded new events.
    pub records: Vec<Record>,
}

impl SaveAggregateInput {
    /// Returns the materialized state this input would store.
    pub fn to_snapshot(&self) -> AggregateSnapshot {
        AggregateSnapshot {
            aggregate_id: self.aggregate_id.clone(),
            aggregate_type: self.aggregate_type.clone(),
            version: self.version,
            timestamp: Utc::now(),
            state: self.state.clone(),
        }
    }
}

/// A materialized aggregate as written through the aggregate-saving path.
///
/// Loading never reads these back; state is always rebuilt from the
/// history. They exist for stores that serve read models next to events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateSnapshot {
    pub aggregate_id: AggregateId,

    /// The type of aggregate (e.g., "Order").
    pub aggregate_type: String,

    /// The version of the aggregate when it was saved.
    pub version: Version,

    /// When the aggregate was saved.
    pub timestamp: DateTime<Utc>,

    /// The serialized aggregate state.
    pub state: serde_json::Value,
}

impl AggregateSnapshot {
    /// Deserializes the saved state into a concrete type.
    pub fn into_state<T: DeserializeOwned>(self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.state)
    }
}
