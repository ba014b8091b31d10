use async_trait::async_trait;

use crate::{AggregateId, History, Record, Result, SaveAggregateInput, Version, VersionRange};

/// Core trait for event store implementations.
///
/// A store appends encoded records per aggregate identity and hands them
/// back in ascending version order. All implementations must be thread-safe
/// (Send + Sync).
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends records to the aggregate's history.
    ///
    /// After the call the history is still ordered by version. Saving a
    /// version that already exists is a caller error; stores may reject it
    /// or keep both records.
    async fn save(&self, aggregate_id: &AggregateId, records: Vec<Record>) -> Result<()>;

    /// Loads the records of an aggregate whose versions fall in `range`.
    ///
    /// Fails with `AggregateNotFound` only when nothing was ever saved for
    /// the identity. A known aggregate whose records all fall outside the
    /// range yields an empty history.
    async fn load(&self, aggregate_id: &AggregateId, range: VersionRange) -> Result<History>;

    /// Returns the aggregate-saving capability if the store provides one.
    ///
    /// The repository prefers it over [`EventStore::save`] when present.
    fn aggregate_saver(&self) -> Option<&dyn AggregateSaver> {
        None
    }
}

/// Alternate save path that receives the folded aggregate along with its
/// new records, so capable stores can persist both atomically.
#[async_trait]
pub trait AggregateSaver: Send + Sync {
    async fn save_aggregate(&self, input: SaveAggregateInput) -> Result<()>;
}

/// Extension trait providing convenience methods for event stores.
#[async_trait]
pub trait EventStoreExt: EventStore {
    /// Loads the entire history of an aggregate.
    async fn load_all(&self, aggregate_id: &AggregateId) -> Result<History> {
        self.load(aggregate_id, VersionRange::all()).await
    }

    /// Checks if an aggregate exists (has any records).
    async fn aggregate_exists(&self, aggregate_id: &AggregateId) -> Result<bool> {
        match self.load_all(aggregate_id).await {
            Ok(history) => Ok(!history.is_empty()),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Gets the version of the latest record.
    ///
    /// Returns None if the aggregate doesn't exist.
    async fn aggregate_version(&self, aggregate_id: &AggregateId) -> Result<Option<Version>> {
        match self.load_all(aggregate_id).await {
            Ok(history) => Ok(history.last_version()),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

// Blanket implementation for all EventStore implementations
impl<T: EventStore + ?Sized> EventStoreExt for T {}

#[async_trait]
impl<T: EventStore + ?Sized> EventStore for std::sync::Arc<T> {
    async fn save(&self, aggregate_id: &AggregateId, records: Vec<Record>) -> Result<()> {
        (**self).save(aggregate_id, records).await
    }

    async fn load(&self, aggregate_id: &AggregateId, range: VersionRange) -> Result<History> {
        (**self).load(aggregate_id, range).await
    }

    fn aggregate_saver(&self) -> Option<&dyn AggregateSaver> {
        (**self).aggregate_saver()
    }
}
