use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::{
    AggregateId, AggregateSnapshot, EventStoreError, History, Record, Result, SaveAggregateInput,
    VersionRange,
    store::{AggregateSaver, EventStore},
};

/// History of one aggregate plus whatever was saved next to it.
#[derive(Debug, Default)]
struct Stream {
    history: History,
    saved: Option<AggregateSnapshot>,
}

/// In-memory event store implementation for testing.
///
/// Every aggregate has its own lock, so writers to different aggregates
/// never wait on each other. The outer map lock is held only long enough
/// to find or create a stream.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    streams: Arc<RwLock<HashMap<AggregateId, Arc<Mutex<Stream>>>>>,
    save_aggregates: bool,
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory event store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that advertises [`AggregateSaver`] and keeps the
    /// latest saved aggregate per identity.
    pub fn with_aggregate_saver() -> Self {
        Self {
            save_aggregates: true,
            ..Self::default()
        }
    }

    /// Returns the total number of records stored.
    pub async fn event_count(&self) -> usize {
        let streams: Vec<_> = self.streams.read().await.values().cloned().collect();
        let mut count = 0;
        for stream in streams {
            count += stream.lock().await.history.len();
        }
        count
    }

    /// Returns the aggregate last written through the aggregate-saving path.
    pub async fn saved_aggregate(&self, aggregate_id: &AggregateId) -> Option<AggregateSnapshot> {
        let stream = self.streams.read().await.get(aggregate_id).cloned()?;
        let stream = stream.lock().await;
        stream.saved.clone()
    }

    /// Clears all records and saved aggregates.
    pub async fn clear(&self) {
        self.streams.write().await.clear();
    }

    async fn stream(&self, aggregate_id: &AggregateId) -> Arc<Mutex<Stream>> {
        if let Some(stream) = self.streams.read().await.get(aggregate_id) {
            return stream.clone();
        }
        let mut streams = self.streams.write().await;
        streams.entry(aggregate_id.clone()).or_default().clone()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn save(&self, aggregate_id: &AggregateId, records: Vec<Record>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let count = records.len();
        let stream = self.stream(aggregate_id).await;
        stream.lock().await.history.append(records);

        tracing::trace!(%aggregate_id, count, "records saved");
        Ok(())
    }

    async fn load(&self, aggregate_id: &AggregateId, range: VersionRange) -> Result<History> {
        let stream = self
            .streams
            .read()
            .await
            .get(aggregate_id)
            .cloned()
            .ok_or_else(|| EventStoreError::AggregateNotFound(aggregate_id.clone()))?;

        let stream = stream.lock().await;
        if range.is_full() {
            return Ok(stream.history.clone());
        }

        Ok(stream
            .history
            .iter()
            .filter(|record| range.contains(record.version))
            .cloned()
            .collect())
    }

    fn aggregate_saver(&self) -> Option<&dyn AggregateSaver> {
        self.save_aggregates.then_some(self as &dyn AggregateSaver)
    }
}

#[async_trait]
impl AggregateSaver for InMemoryEventStore {
    async fn save_aggregate(&self, input: SaveAggregateInput) -> Result<()> {
        if input.records.is_empty() {
            return Ok(());
        }
        let snapshot = input.to_snapshot();
        let stream = self.stream(&input.aggregate_id).await;

        // Records and state change under the same lock.
        let mut stream = stream.lock().await;
        stream.history.append(input.records);
        stream.saved = Some(snapshot);
        Ok(())
    }
}
