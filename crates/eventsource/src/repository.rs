//! Loading, saving and applying commands to aggregates.

use std::sync::Arc;

use common::AggregateId;
use event_store::{EventStore, InMemoryEventStore, SaveAggregateInput, Version, VersionRange};
use serde::Serialize;

use crate::aggregate::{Aggregate, CommandHandler};
use crate::command::Command;
use crate::error::DomainError;
use crate::event::{DomainEvent, Event};
use crate::observer::EventObserver;
use crate::serializer::{JsonSerializer, Serializer};

/// Rebuilds aggregates from their history and persists new events.
///
/// The repository is stateless between calls apart from its configuration,
/// so one instance can be shared behind an `Arc` by many tasks.
pub struct Repository<A: Aggregate, S = InMemoryEventStore> {
    store: S,
    serializer: Arc<dyn Serializer<A::Event>>,
    observers: Vec<Arc<dyn EventObserver<A::Event>>>,
    debug: bool,
}

impl<A: Aggregate> Repository<A> {
    /// Creates a repository over a fresh in-memory store and a serializer
    /// with no registered event types.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> RepositoryBuilder<A> {
        RepositoryBuilder {
            store: InMemoryEventStore::new(),
            serializer: None,
            observers: Vec::new(),
            debug: false,
        }
    }
}

impl<A: Aggregate> Default for Repository<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Aggregate, S: EventStore> Repository<A, S> {
    /// Returns the zero value of the aggregate.
    pub fn new_instance(&self) -> A {
        A::default()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn serializer(&self) -> &dyn Serializer<A::Event> {
        self.serializer.as_ref()
    }

    /// Replays the full history of an aggregate.
    ///
    /// Returns the folded aggregate and the version of the last event
    /// applied. An identity with no history fails with
    /// [`DomainError::AggregateNotFound`].
    #[tracing::instrument(skip(self), fields(aggregate_type = A::aggregate_type()))]
    pub async fn load(&self, aggregate_id: &AggregateId) -> Result<(A, Version), DomainError> {
        let history = match self.store.load(aggregate_id, VersionRange::all()).await {
            Ok(history) => history,
            Err(e) if e.is_not_found() => return Err(not_found::<A>(aggregate_id)),
            Err(e) => return Err(e.into()),
        };
        if history.is_empty() {
            return Err(not_found::<A>(aggregate_id));
        }

        let mut aggregate = self.new_instance();
        let mut version = Version::initial();
        for record in &history {
            let event = self.serializer.unmarshal_event(record)?;
            if self.debug {
                tracing::debug!(
                    version = %record.version,
                    event_type = %event.event_type(),
                    "replaying event"
                );
            }
            aggregate
                .on(&event)
                .map_err(|source| unhandled(aggregate_id, &event, source))?;
            version = event.event_version();
        }

        metrics::histogram!("eventsource_replayed_events").record(history.len() as f64);
        tracing::trace!(%version, events = history.len(), "aggregate loaded");

        Ok((aggregate, version))
    }

    /// Persists events under the identity of the first one.
    #[tracing::instrument(skip(self, events), fields(aggregate_type = A::aggregate_type(), count = events.len()))]
    pub async fn save(&self, events: &[A::Event]) -> Result<(), DomainError> {
        let Some(first) = events.first() else {
            return Ok(());
        };

        let aggregate_id = first.aggregate_id().clone();
        let history = self.serializer.marshal_all(events)?;
        self.store.save(&aggregate_id, history.into_inner()).await?;

        metrics::counter!("eventsource_events_saved_total").increment(events.len() as u64);
        Ok(())
    }

    /// Runs a command against the current state and persists the events it
    /// produces.
    ///
    /// A missing aggregate is treated as a fresh instance at version 0.
    /// Returns the version of the last new event, or the loaded version
    /// when the command produced nothing. Observers see the new events
    /// only after they were stored.
    #[tracing::instrument(
        skip(self, command),
        fields(aggregate_type = A::aggregate_type(), aggregate_id = %command.aggregate_id())
    )]
    pub async fn apply(&self, command: &A::Command) -> Result<Version, DomainError>
    where
        A: CommandHandler + Serialize,
    {
        let aggregate_id = command.aggregate_id();
        if aggregate_id.is_empty() {
            return Err(DomainError::InvalidCommand("command has no aggregate id"));
        }

        let (mut aggregate, version) = match self.load(aggregate_id).await {
            Ok(loaded) => loaded,
            Err(e) if e.is_not_found() => (self.new_instance(), Version::initial()),
            Err(e) => return Err(e),
        };

        let events = aggregate.handle(command).map_err(|e| {
            metrics::counter!("eventsource_commands_rejected_total").increment(1);
            DomainError::Rejected(Box::new(e))
        })?;

        let Some(last) = events.last() else {
            metrics::counter!("eventsource_commands_applied_total").increment(1);
            tracing::trace!(%version, "command produced no events");
            return Ok(version);
        };
        let new_version = last.event_version();

        let history = self.serializer.marshal_all(&events)?;
        match self.store.aggregate_saver() {
            Some(saver) => {
                for event in &events {
                    aggregate
                        .on(event)
                        .map_err(|source| unhandled(aggregate_id, event, source))?;
                }
                let input = SaveAggregateInput {
                    aggregate_id: aggregate_id.clone(),
                    aggregate_type: A::aggregate_type().to_string(),
                    version: new_version,
                    state: serde_json::to_value(&aggregate)?,
                    event_types: events.iter().map(|e| e.event_type().into_owned()).collect(),
                    records: history.into_inner(),
                };
                saver.save_aggregate(input).await?;
            }
            None => self.store.save(aggregate_id, history.into_inner()).await?,
        }

        metrics::counter!("eventsource_events_saved_total").increment(events.len() as u64);
        metrics::counter!("eventsource_commands_applied_total").increment(1);
        tracing::trace!(%new_version, events = events.len(), "command applied");

        for event in &events {
            for observer in &self.observers {
                observer.on_event(event);
            }
        }

        Ok(new_version)
    }
}

fn not_found<A: Aggregate>(aggregate_id: &AggregateId) -> DomainError {
    DomainError::AggregateNotFound {
        aggregate_type: A::aggregate_type(),
        aggregate_id: aggregate_id.clone(),
    }
}

fn unhandled<E, C>(aggregate_id: &AggregateId, event: &E, source: C) -> DomainError
where
    E: DomainEvent,
    C: std::error::Error + Send + Sync + 'static,
{
    DomainError::UnhandledEvent {
        aggregate_id: aggregate_id.clone(),
        event_type: event.event_type().into_owned(),
        source: Box::new(source),
    }
}

/// Configures a [`Repository`]. Observers can only be added here, so the
/// list never changes once the repository is running.
pub struct RepositoryBuilder<A: Aggregate, S = InMemoryEventStore> {
    store: S,
    serializer: Option<Arc<dyn Serializer<A::Event>>>,
    observers: Vec<Arc<dyn EventObserver<A::Event>>>,
    debug: bool,
}

impl<A: Aggregate, S: EventStore> RepositoryBuilder<A, S> {
    /// Replaces the store.
    pub fn store<S2: EventStore>(self, store: S2) -> RepositoryBuilder<A, S2> {
        RepositoryBuilder {
            store,
            serializer: self.serializer,
            observers: self.observers,
            debug: self.debug,
        }
    }

    pub fn serializer(mut self, serializer: impl Serializer<A::Event> + 'static) -> Self {
        self.serializer = Some(Arc::new(serializer));
        self
    }

    /// Uses a serializer that is shared with other repositories.
    pub fn shared_serializer(mut self, serializer: Arc<dyn Serializer<A::Event>>) -> Self {
        self.serializer = Some(serializer);
        self
    }

    /// Adds an observer. Observers are called in the order they were added.
    pub fn observer(mut self, observer: impl EventObserver<A::Event> + 'static) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    pub fn observers(
        mut self,
        observers: impl IntoIterator<Item = Arc<dyn EventObserver<A::Event>>>,
    ) -> Self {
        self.observers.extend(observers);
        self
    }

    /// Logs every replayed event at debug level.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn build(self) -> Repository<A, S> {
        Repository {
            store: self.store,
            serializer: self
                .serializer
                .unwrap_or_else(|| Arc::new(JsonSerializer::<A::Event>::new())),
            observers: self.observers,
            debug: self.debug,
        }
    }
}
