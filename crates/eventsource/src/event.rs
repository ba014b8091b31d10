//! Event contract shared by every aggregate.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use common::AggregateId;
use event_store::Version;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Identity, version and timestamp carried by every event.
///
/// Concrete events embed it with `#[serde(flatten)]` and only add their
/// domain fields.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventModel {
    /// The aggregate this event belongs to.
    pub id: AggregateId,

    /// Version of the aggregate after this event.
    pub version: Version,

    /// When the event occurred.
    pub at: DateTime<Utc>,
}

impl EventModel {
    /// Creates a model stamped with the current time.
    pub fn new(id: impl Into<AggregateId>, version: Version) -> Self {
        Self {
            id: id.into(),
            version,
            at: Utc::now(),
        }
    }

    /// Replaces the timestamp.
    pub fn at(mut self, at: DateTime<Utc>) -> Self {
        self.at = at;
        self
    }
}

/// Trait for anything that carries an [`EventModel`].
pub trait Event: Send + Sync {
    fn model(&self) -> &EventModel;

    fn aggregate_id(&self) -> &AggregateId {
        &self.model().id
    }

    fn event_version(&self) -> Version {
        self.model().version
    }

    fn event_at(&self) -> DateTime<Utc> {
        self.model().at
    }
}

impl Event for EventModel {
    fn model(&self) -> &EventModel {
        self
    }
}

/// A concrete, persistable event type.
///
/// The type name is the tag written next to the payload. It defaults to
/// the unqualified Rust type name; override `event_type` to keep persisted
/// tags stable across renames.
pub trait EventKind: Event + Serialize + DeserializeOwned + 'static {
    fn event_type() -> Cow<'static, str> {
        Cow::Borrowed(short_type_name::<Self>())
    }
}

/// The closed set of events one aggregate folds.
///
/// Usually an enum with one variant per [`EventKind`].
pub trait DomainEvent: Event + Clone + std::fmt::Debug + 'static {
    /// Returns the tag of the concrete event held by this value.
    fn event_type(&self) -> Cow<'static, str>;

    /// Encodes the concrete event's fields.
    fn payload(&self) -> serde_json::Result<serde_json::Value>;
}

/// Returns the last path segment of a type's name, without generics.
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
