//! Event encoding and the event type registry.

use std::collections::HashMap;
use std::fmt;

use event_store::{History, Record};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SerializerError;
use crate::event::{DomainEvent, EventKind};

/// Converts events to store records and back.
pub trait Serializer<E: DomainEvent>: Send + Sync {
    /// Encodes one event. The record's version is the event's version.
    fn marshal_event(&self, event: &E) -> Result<Record, SerializerError>;

    /// Encodes events in order, stopping at the first failure.
    fn marshal_all(&self, events: &[E]) -> Result<History, SerializerError> {
        events.iter().map(|e| self.marshal_event(e)).collect()
    }

    /// Decodes a record into the concrete event named by its type tag.
    fn unmarshal_event(&self, record: &Record) -> Result<E, SerializerError>;
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    event_type: String,
    data: Value,
}

type Decoder<E> = Box<dyn Fn(Value) -> serde_json::Result<E> + Send + Sync>;

/// JSON serializer backed by a registry of event types.
///
/// Records hold `{"type": <event type>, "data": <payload>}`. The registry
/// is fixed once built and can be shared across tasks.
pub struct JsonSerializer<E> {
    registry: HashMap<String, Decoder<E>>,
}

impl<E: DomainEvent> JsonSerializer<E> {
    /// Creates a serializer that knows no event types.
    pub fn new() -> Self {
        Self {
            registry: HashMap::new(),
        }
    }

    pub fn builder() -> JsonSerializerBuilder<E> {
        JsonSerializerBuilder {
            inner: Self::new(),
        }
    }

    /// Returns true if records tagged `event_type` can be decoded.
    pub fn is_registered(&self, event_type: &str) -> bool {
        self.registry.contains_key(event_type)
    }

    /// Registered event types, sorted.
    pub fn event_types(&self) -> Vec<&str> {
        let mut types: Vec<_> = self.registry.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

impl<E: DomainEvent> Default for JsonSerializer<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for JsonSerializer<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<_> = self.registry.keys().collect();
        types.sort_unstable();
        f.debug_struct("JsonSerializer")
            .field("event_types", &types)
            .finish()
    }
}

impl<E: DomainEvent> Serializer<E> for JsonSerializer<E> {
    fn marshal_event(&self, event: &E) -> Result<Record, SerializerError> {
        let event_type = event.event_type();
        let invalid = |source| SerializerError::InvalidEncoding {
            event_type: Some(event_type.to_string()),
            source,
        };

        let envelope = Envelope {
            event_type: event_type.to_string(),
            data: event.payload().map_err(invalid)?,
        };
        let data = serde_json::to_vec(&envelope).map_err(invalid)?;

        Ok(Record::new(event.event_version(), data))
    }

    fn unmarshal_event(&self, record: &Record) -> Result<E, SerializerError> {
        let envelope: Envelope =
            serde_json::from_slice(&record.data).map_err(|source| {
                SerializerError::InvalidEncoding {
                    event_type: None,
                    source,
                }
            })?;

        let decode = self
            .registry
            .get(&envelope.event_type)
            .ok_or_else(|| SerializerError::UnboundEventType(envelope.event_type.clone()))?;

        decode(envelope.data).map_err(|source| SerializerError::InvalidEncoding {
            event_type: Some(envelope.event_type),
            source,
        })
    }
}

/// Collects event types before the registry is frozen.
pub struct JsonSerializerBuilder<E> {
    inner: JsonSerializer<E>,
}

impl<E: DomainEvent> JsonSerializerBuilder<E> {
    /// Binds `T::event_type()` to `T`. Registering a second type under the
    /// same name replaces the first.
    pub fn register<T>(mut self) -> Self
    where
        T: EventKind + Into<E>,
    {
        let decoder: Decoder<E> =
            Box::new(|data| serde_json::from_value::<T>(data).map(Into::into));
        self.inner
            .registry
            .insert(T::event_type().into_owned(), decoder);
        self
    }

    /// Registers the type of `example`.
    pub fn register_example<T>(self, _example: &T) -> Self
    where
        T: EventKind + Into<E>,
    {
        self.register::<T>()
    }

    pub fn build(self) -> JsonSerializer<E> {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;
    use crate::testing::{EntityCreated, EntityEvent, EntityNameSet};
    use crate::{ErrorKind, Event, EventModel, kind_of};
    use event_store::Version;

    /// JSON objects need string keys, so any marked cell fails to encode.
    #[derive(Debug, Clone, Serialize)]
    struct CellsMarked {
        #[serde(flatten)]
        model: EventModel,
        cells: HashMap<(i32, i32), bool>,
    }

    impl CellsMarked {
        fn new(version: i64, cells: &[(i32, i32)]) -> Self {
            Self {
                model: EventModel::new("board", Version::new(version)),
                cells: cells.iter().map(|&cell| (cell, true)).collect(),
            }
        }
    }

    impl Event for CellsMarked {
        fn model(&self) -> &EventModel {
            &self.model
        }
    }

    impl DomainEvent for CellsMarked {
        fn event_type(&self) -> Cow<'static, str> {
            Cow::Borrowed("CellsMarked")
        }

        fn payload(&self) -> serde_json::Result<Value> {
            serde_json::to_value(self)
        }
    }

    fn serializer() -> JsonSerializer<EntityEvent> {
        JsonSerializer::builder()
            .register::<EntityCreated>()
            .register::<EntityNameSet>()
            .build()
    }

    #[test]
    fn round_trip_preserves_event() {
        let serializer = serializer();
        let event = EntityEvent::name_set("abc", 2, "Jones");

        let record = serializer.marshal_event(&event).unwrap();
        assert_eq!(record.version, Version::new(2));

        let decoded = serializer.unmarshal_event(&record).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn record_data_is_tagged_envelope() {
        let serializer = serializer();
        let record = serializer
            .marshal_event(&EntityEvent::name_set("abc", 2, "Jones"))
            .unwrap();

        let json: Value = serde_json::from_slice(&record.data).unwrap();
        assert_eq!(json["type"], "EntityNameSet");
        assert_eq!(json["data"]["name"], "Jones");
        assert_eq!(json["data"]["id"], "abc");
        assert_eq!(json["data"]["version"], 2);
    }

    #[test]
    fn marshal_all_keeps_input_order() {
        let serializer = serializer();
        let events = vec![
            EntityEvent::created("abc", 1),
            EntityEvent::name_set("abc", 2, "Jones"),
        ];

        let history = serializer.marshal_all(&events).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].version, Version::new(1));
        assert_eq!(history[1].version, Version::new(2));
    }

    #[test]
    fn unencodable_payload_is_invalid_encoding() {
        let serializer = JsonSerializer::<CellsMarked>::new();
        assert!(serializer.marshal_event(&CellsMarked::new(1, &[])).is_ok());

        let err = serializer
            .marshal_event(&CellsMarked::new(1, &[(0, 0)]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidEncoding);
        assert!(matches!(
            &err,
            SerializerError::InvalidEncoding { event_type: Some(t), .. } if t == "CellsMarked"
        ));
    }

    #[test]
    fn marshal_all_stops_at_first_failure() {
        let serializer = JsonSerializer::<CellsMarked>::new();
        let events = vec![
            CellsMarked::new(1, &[]),
            CellsMarked::new(2, &[(1, 2)]),
            CellsMarked::new(3, &[]),
        ];

        let err = serializer.marshal_all(&events).unwrap_err();
        assert_eq!(kind_of(&err), Some(ErrorKind::InvalidEncoding));
    }

    #[test]
    fn unregistered_type_is_unbound() {
        let serializer = serializer();
        let record = serializer
            .marshal_event(&EntityEvent::deleted("abc", 3))
            .unwrap();

        let err = serializer.unmarshal_event(&record).unwrap_err();
        assert!(matches!(&err, SerializerError::UnboundEventType(t) if t == "EntityDeleted"));
        assert_eq!(kind_of(&err), Some(ErrorKind::UnboundEventType));
    }

    #[test]
    fn garbage_bytes_are_invalid_encoding() {
        let serializer = serializer();
        let record = Record::new(Version::new(1), b"not json".to_vec());

        let err = serializer.unmarshal_event(&record).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidEncoding);
    }

    #[test]
    fn payload_of_wrong_shape_is_invalid_encoding() {
        let serializer = serializer();
        let data = serde_json::to_vec(&serde_json::json!({
            "type": "EntityNameSet",
            "data": {"name": 42},
        }))
        .unwrap();

        let err = serializer
            .unmarshal_event(&Record::new(Version::new(1), data))
            .unwrap_err();
        assert!(matches!(
            err,
            SerializerError::InvalidEncoding { event_type: Some(ref t), .. } if t == "EntityNameSet"
        ));
    }

    #[test]
    fn register_example_uses_value_type() {
        let example = EntityCreated {
            model: EventModel::default(),
        };
        let serializer = JsonSerializer::<EntityEvent>::builder()
            .register_example(&example)
            .build();

        assert!(serializer.is_registered("EntityCreated"));
        assert_eq!(serializer.event_types(), vec!["EntityCreated"]);
    }

    #[test]
    fn registering_twice_keeps_one_entry() {
        let serializer = JsonSerializer::<EntityEvent>::builder()
            .register::<EntityCreated>()
            .register::<EntityCreated>()
            .build();

        assert_eq!(serializer.event_types().len(), 1);
    }
}
