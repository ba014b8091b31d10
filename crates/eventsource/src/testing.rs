//! Entity aggregate shared by the unit tests.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use common::AggregateId;
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::{
    Aggregate, Command, CommandHandler, CommandModel, DomainEvent, Event, EventKind, EventModel,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityCreated {
    #[serde(flatten)]
    pub model: EventModel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityNameSet {
    #[serde(flatten)]
    pub model: EventModel,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDeleted {
    #[serde(flatten)]
    pub model: EventModel,
}

impl Event for EntityCreated {
    fn model(&self) -> &EventModel {
        &self.model
    }
}

impl Event for EntityNameSet {
    fn model(&self) -> &EventModel {
        &self.model
    }
}

impl Event for EntityDeleted {
    fn model(&self) -> &EventModel {
        &self.model
    }
}

impl EventKind for EntityCreated {}
impl EventKind for EntityNameSet {}
impl EventKind for EntityDeleted {}

#[derive(Debug, Clone, PartialEq)]
pub enum EntityEvent {
    Created(EntityCreated),
    NameSet(EntityNameSet),
    Deleted(EntityDeleted),
}

impl EntityEvent {
    pub fn created(id: &str, version: i64) -> Self {
        EntityEvent::Created(EntityCreated {
            model: EventModel::new(id, Version::new(version)),
        })
    }

    pub fn name_set(id: &str, version: i64, name: &str) -> Self {
        EntityEvent::NameSet(EntityNameSet {
            model: EventModel::new(id, Version::new(version)),
            name: name.to_string(),
        })
    }

    pub fn deleted(id: &str, version: i64) -> Self {
        EntityEvent::Deleted(EntityDeleted {
            model: EventModel::new(id, Version::new(version)),
        })
    }
}

impl From<EntityCreated> for EntityEvent {
    fn from(event: EntityCreated) -> Self {
        EntityEvent::Created(event)
    }
}

impl From<EntityNameSet> for EntityEvent {
    fn from(event: EntityNameSet) -> Self {
        EntityEvent::NameSet(event)
    }
}

impl From<EntityDeleted> for EntityEvent {
    fn from(event: EntityDeleted) -> Self {
        EntityEvent::Deleted(event)
    }
}

impl Event for EntityEvent {
    fn model(&self) -> &EventModel {
        match self {
            EntityEvent::Created(e) => e.model(),
            EntityEvent::NameSet(e) => e.model(),
            EntityEvent::Deleted(e) => e.model(),
        }
    }
}

impl DomainEvent for EntityEvent {
    fn event_type(&self) -> Cow<'static, str> {
        match self {
            EntityEvent::Created(_) => EntityCreated::event_type(),
            EntityEvent::NameSet(_) => EntityNameSet::event_type(),
            EntityEvent::Deleted(_) => EntityDeleted::event_type(),
        }
    }

    fn payload(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            EntityEvent::Created(e) => serde_json::to_value(e),
            EntityEvent::NameSet(e) => serde_json::to_value(e),
            EntityEvent::Deleted(e) => serde_json::to_value(e),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EntityError {
    #[error("entity {0} is deleted")]
    Deleted(AggregateId),
    #[error("entity {0} does not exist")]
    NotCreated(AggregateId),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: AggregateId,
    pub version: Version,
    pub name: String,
    pub deleted: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Aggregate for Entity {
    type Event = EntityEvent;
    type Error = EntityError;

    fn aggregate_type() -> &'static str {
        "Entity"
    }

    fn on(&mut self, event: &Self::Event) -> Result<(), Self::Error> {
        if self.deleted {
            return Err(EntityError::Deleted(self.id.clone()));
        }
        match event {
            EntityEvent::Created(e) => {
                self.id = e.model.id.clone();
                self.created_at = Some(e.model.at);
            }
            EntityEvent::NameSet(e) => self.name = e.name.clone(),
            EntityEvent::Deleted(_) => self.deleted = true,
        }
        self.version = event.event_version();
        self.updated_at = Some(event.event_at());
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub enum EntityCommand {
    Create(CommandModel),
    SetName { model: CommandModel, name: String },
    Nop(CommandModel),
}

impl Command for EntityCommand {
    fn aggregate_id(&self) -> &AggregateId {
        match self {
            EntityCommand::Create(m) | EntityCommand::Nop(m) => &m.id,
            EntityCommand::SetName { model, .. } => &model.id,
        }
    }
}

impl CommandHandler for Entity {
    type Command = EntityCommand;

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        let next = EventModel::new(command.aggregate_id().clone(), self.version.next());
        match command {
            EntityCommand::Create(_) => Ok(vec![EntityCreated { model: next }.into()]),
            EntityCommand::SetName { name, .. } => {
                if self.id.is_empty() {
                    return Err(EntityError::NotCreated(command.aggregate_id().clone()));
                }
                Ok(vec![
                    EntityNameSet {
                        model: next,
                        name: name.clone(),
                    }
                    .into(),
                ])
            }
            EntityCommand::Nop(_) => Ok(vec![]),
        }
    }
}

pub fn create(id: &str) -> EntityCommand {
    EntityCommand::Create(CommandModel::new(id))
}

pub fn set_name(id: &str, name: &str) -> EntityCommand {
    EntityCommand::SetName {
        model: CommandModel::new(id),
        name: name.to_string(),
    }
}

pub fn nop(id: &str) -> EntityCommand {
    EntityCommand::Nop(CommandModel::new(id))
}
