//! Sample order aggregate.

use std::borrow::Cow;

use common::AggregateId;
use eventsource::{
    Aggregate, Command, CommandHandler, CommandModel, DomainEvent, Event, EventKind, EventModel,
    JsonSerializer, Version,
};
use serde::{Deserialize, Serialize};

/// The state of an order in its lifecycle.
///
/// ```text
/// Draft ──► Placed ──► Shipped
///   │         │
///   └─────────┴──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrderState {
    #[default]
    Draft,
    Placed,
    Shipped,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPlaced {
    #[serde(flatten)]
    pub model: EventModel,
    pub customer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemAdded {
    #[serde(flatten)]
    pub model: EventModel,
    pub sku: String,
    pub quantity: u32,
    pub unit_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderShipped {
    #[serde(flatten)]
    pub model: EventModel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCancelled {
    #[serde(flatten)]
    pub model: EventModel,
    pub reason: String,
}

macro_rules! event_kind {
    ($($variant:ident($ty:ident) => $tag:literal),* $(,)?) => {
        $(
            impl From<$ty> for OrderEvent {
                fn from(event: $ty) -> Self {
                    OrderEvent::$variant(event)
                }
            }

            impl Event for $ty {
                fn model(&self) -> &EventModel {
                    &self.model
                }
            }

            impl EventKind for $ty {
                fn event_type() -> Cow<'static, str> {
                    Cow::Borrowed($tag)
                }
            }
        )*
    };
}

event_kind! {
    Placed(OrderPlaced) => "order.placed",
    ItemAdded(ItemAdded) => "order.item_added",
    Shipped(OrderShipped) => "order.shipped",
    Cancelled(OrderCancelled) => "order.cancelled",
}

/// Events that can occur on an order.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderEvent {
    Placed(OrderPlaced),
    ItemAdded(ItemAdded),
    Shipped(OrderShipped),
    Cancelled(OrderCancelled),
}

impl OrderEvent {
    fn kind(&self) -> &dyn Event {
        match self {
            OrderEvent::Placed(e) => e,
            OrderEvent::ItemAdded(e) => e,
            OrderEvent::Shipped(e) => e,
            OrderEvent::Cancelled(e) => e,
        }
    }
}

impl Event for OrderEvent {
    fn model(&self) -> &EventModel {
        self.kind().model()
    }
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> Cow<'static, str> {
        match self {
            OrderEvent::Placed(_) => OrderPlaced::event_type(),
            OrderEvent::ItemAdded(_) => ItemAdded::event_type(),
            OrderEvent::Shipped(_) => OrderShipped::event_type(),
            OrderEvent::Cancelled(_) => OrderCancelled::event_type(),
        }
    }

    fn payload(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            OrderEvent::Placed(e) => serde_json::to_value(e),
            OrderEvent::ItemAdded(e) => serde_json::to_value(e),
            OrderEvent::Shipped(e) => serde_json::to_value(e),
            OrderEvent::Cancelled(e) => serde_json::to_value(e),
        }
    }
}

/// Builds the serializer that knows every order event.
pub fn serializer() -> JsonSerializer<OrderEvent> {
    JsonSerializer::builder()
        .register::<OrderPlaced>()
        .register::<ItemAdded>()
        .register::<OrderShipped>()
        .register::<OrderCancelled>()
        .build()
}

/// Errors that can occur during order operations.
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("order {0} was already placed")]
    AlreadyPlaced(AggregateId),

    #[error("order {0} has not been placed")]
    NotPlaced(AggregateId),

    #[error("cannot {action} order in state {state:?}")]
    InvalidState {
        action: &'static str,
        state: OrderState,
    },

    #[error("quantity must be positive")]
    InvalidQuantity,

    #[error("cannot ship an empty order")]
    EmptyOrder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub sku: String,
    pub quantity: u32,
    pub unit_cents: i64,
}

/// Order aggregate root.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: AggregateId,
    pub version: Version,
    pub customer: String,
    pub state: OrderState,
    pub items: Vec<LineItem>,
}

impl Order {
    pub fn total_cents(&self) -> i64 {
        self.items
            .iter()
            .map(|item| i64::from(item.quantity) * item.unit_cents)
            .sum()
    }

    fn require(&self, state: OrderState, action: &'static str) -> Result<(), OrderError> {
        match self.state {
            s if s == state => Ok(()),
            OrderState::Draft => Err(OrderError::NotPlaced(self.id.clone())),
            s => Err(OrderError::InvalidState { action, state: s }),
        }
    }
}

impl Aggregate for Order {
    type Event = OrderEvent;
    type Error = OrderError;

    fn aggregate_type() -> &'static str {
        "Order"
    }

    fn on(&mut self, event: &Self::Event) -> Result<(), Self::Error> {
        match event {
            OrderEvent::Placed(e) => {
                self.id = e.model.id.clone();
                self.customer = e.customer.clone();
                self.state = OrderState::Placed;
            }
            OrderEvent::ItemAdded(e) => self.items.push(LineItem {
                sku: e.sku.clone(),
                quantity: e.quantity,
                unit_cents: e.unit_cents,
            }),
            OrderEvent::Shipped(_) => self.state = OrderState::Shipped,
            OrderEvent::Cancelled(_) => self.state = OrderState::Cancelled,
        }
        self.version = event.event_version();
        Ok(())
    }
}

/// Commands accepted by [`Order`].
#[derive(Debug, Clone)]
pub enum OrderCommand {
    Place {
        model: CommandModel,
        customer: String,
    },
    AddItem {
        model: CommandModel,
        sku: String,
        quantity: u32,
        unit_cents: i64,
    },
    Ship(CommandModel),
    Cancel {
        model: CommandModel,
        reason: String,
    },
}

impl OrderCommand {
    pub fn place(id: &AggregateId, customer: impl Into<String>) -> Self {
        OrderCommand::Place {
            model: CommandModel::new(id.clone()),
            customer: customer.into(),
        }
    }

    pub fn add_item(
        id: &AggregateId,
        sku: impl Into<String>,
        quantity: u32,
        unit_cents: i64,
    ) -> Self {
        OrderCommand::AddItem {
            model: CommandModel::new(id.clone()),
            sku: sku.into(),
            quantity,
            unit_cents,
        }
    }

    pub fn ship(id: &AggregateId) -> Self {
        OrderCommand::Ship(CommandModel::new(id.clone()))
    }

    pub fn cancel(id: &AggregateId, reason: impl Into<String>) -> Self {
        OrderCommand::Cancel {
            model: CommandModel::new(id.clone()),
            reason: reason.into(),
        }
    }
}

impl Command for OrderCommand {
    fn aggregate_id(&self) -> &AggregateId {
        match self {
            OrderCommand::Place { model, .. }
            | OrderCommand::AddItem { model, .. }
            | OrderCommand::Ship(model)
            | OrderCommand::Cancel { model, .. } => &model.id,
        }
    }
}

impl CommandHandler for Order {
    type Command = OrderCommand;

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        let id = command.aggregate_id();
        let model = EventModel::new(id.clone(), self.version.next());

        let event = match command {
            OrderCommand::Place { customer, .. } => {
                if self.state != OrderState::Draft {
                    return Err(OrderError::AlreadyPlaced(id.clone()));
                }
                OrderEvent::Placed(OrderPlaced {
                    model,
                    customer: customer.clone(),
                })
            }
            OrderCommand::AddItem {
                sku,
                quantity,
                unit_cents,
                ..
            } => {
                self.require(OrderState::Placed, "add items to")?;
                if *quantity == 0 {
                    return Err(OrderError::InvalidQuantity);
                }
                OrderEvent::ItemAdded(ItemAdded {
                    model,
                    sku: sku.clone(),
                    quantity: *quantity,
                    unit_cents: *unit_cents,
                })
            }
            OrderCommand::Ship(_) => {
                self.require(OrderState::Placed, "ship")?;
                if self.items.is_empty() {
                    return Err(OrderError::EmptyOrder);
                }
                OrderEvent::Shipped(OrderShipped { model })
            }
            OrderCommand::Cancel { reason, .. } => {
                if self.state == OrderState::Cancelled {
                    return Ok(vec![]);
                }
                self.require(OrderState::Placed, "cancel")?;
                OrderEvent::Cancelled(OrderCancelled {
                    model,
                    reason: reason.clone(),
                })
            }
        };
        Ok(vec![event])
    }
}
