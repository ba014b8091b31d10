//! Account aggregate used by the integration suites.

#![allow(dead_code)]

use std::borrow::Cow;

use eventsource::{
    Aggregate, AggregateId, Command, CommandHandler, CommandModel, DomainEvent, Event, EventKind,
    EventModel, JsonSerializer, Version,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountOpened {
    #[serde(flatten)]
    pub model: EventModel,
    pub owner: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundsDeposited {
    #[serde(flatten)]
    pub model: EventModel,
    pub cents: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundsWithdrawn {
    #[serde(flatten)]
    pub model: EventModel,
    pub cents: i64,
}

impl Event for AccountOpened {
    fn model(&self) -> &EventModel {
        &self.model
    }
}

impl Event for FundsDeposited {
    fn model(&self) -> &EventModel {
        &self.model
    }
}

impl Event for FundsWithdrawn {
    fn model(&self) -> &EventModel {
        &self.model
    }
}

impl EventKind for AccountOpened {
    fn event_type() -> Cow<'static, str> {
        Cow::Borrowed("account.opened")
    }
}

impl EventKind for FundsDeposited {}
impl EventKind for FundsWithdrawn {}

#[derive(Debug, Clone, PartialEq)]
pub enum AccountEvent {
    Opened(AccountOpened),
    Deposited(FundsDeposited),
    Withdrawn(FundsWithdrawn),
}

impl From<AccountOpened> for AccountEvent {
    fn from(event: AccountOpened) -> Self {
        AccountEvent::Opened(event)
    }
}

impl From<FundsDeposited> for AccountEvent {
    fn from(event: FundsDeposited) -> Self {
        AccountEvent::Deposited(event)
    }
}

impl From<FundsWithdrawn> for AccountEvent {
    fn from(event: FundsWithdrawn) -> Self {
        AccountEvent::Withdrawn(event)
    }
}

impl Event for AccountEvent {
    fn model(&self) -> &EventModel {
        match self {
            AccountEvent::Opened(e) => e.model(),
            AccountEvent::Deposited(e) => e.model(),
            AccountEvent::Withdrawn(e) => e.model(),
        }
    }
}

impl DomainEvent for AccountEvent {
    fn event_type(&self) -> Cow<'static, str> {
        match self {
            AccountEvent::Opened(_) => AccountOpened::event_type(),
            AccountEvent::Deposited(_) => FundsDeposited::event_type(),
            AccountEvent::Withdrawn(_) => FundsWithdrawn::event_type(),
        }
    }

    fn payload(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            AccountEvent::Opened(e) => serde_json::to_value(e),
            AccountEvent::Deposited(e) => serde_json::to_value(e),
            AccountEvent::Withdrawn(e) => serde_json::to_value(e),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("account {0} is already open")]
    AlreadyOpen(AggregateId),
    #[error("account {0} is not open")]
    NotOpen(AggregateId),
    #[error("insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: i64, requested: i64 },
    #[error("withdrawal from {0} arrived before the account was opened")]
    OutOfOrder(AggregateId),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AggregateId,
    pub version: Version,
    pub owner: String,
    pub balance: i64,
}

impl Aggregate for Account {
    type Event = AccountEvent;
    type Error = AccountError;

    fn aggregate_type() -> &'static str {
        "Account"
    }

    fn on(&mut self, event: &Self::Event) -> Result<(), Self::Error> {
        match event {
            AccountEvent::Opened(e) => {
                self.id = e.model.id.clone();
                self.owner = e.owner.clone();
            }
            AccountEvent::Deposited(e) => self.balance += e.cents,
            AccountEvent::Withdrawn(e) => {
                if self.id.is_empty() {
                    return Err(AccountError::OutOfOrder(e.model.id.clone()));
                }
                self.balance -= e.cents;
            }
        }
        self.version = event.event_version();
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub enum AccountCommand {
    Open { model: CommandModel, owner: String },
    Deposit { model: CommandModel, cents: i64 },
    Withdraw { model: CommandModel, cents: i64 },
    Audit(CommandModel),
}

impl Command for AccountCommand {
    fn aggregate_id(&self) -> &AggregateId {
        match self {
            AccountCommand::Open { model, .. }
            | AccountCommand::Deposit { model, .. }
            | AccountCommand::Withdraw { model, .. }
            | AccountCommand::Audit(model) => &model.id,
        }
    }
}

impl CommandHandler for Account {
    type Command = AccountCommand;

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        let id = command.aggregate_id();
        let next = EventModel::new(id.clone(), self.version.next());

        let opened = !self.id.is_empty();
        match command {
            AccountCommand::Open { .. } if opened => Err(AccountError::AlreadyOpen(id.clone())),
            AccountCommand::Open { owner, .. } => Ok(vec![
                AccountOpened {
                    model: next,
                    owner: owner.clone(),
                }
                .into(),
            ]),
            AccountCommand::Audit(_) => Ok(vec![]),
            _ if !opened => Err(AccountError::NotOpen(id.clone())),
            AccountCommand::Deposit { cents, .. } => Ok(vec![
                FundsDeposited {
                    model: next,
                    cents: *cents,
                }
                .into(),
            ]),
            AccountCommand::Withdraw { cents, .. } if *cents > self.balance => {
                Err(AccountError::InsufficientFunds {
                    balance: self.balance,
                    requested: *cents,
                })
            }
            AccountCommand::Withdraw { cents, .. } => Ok(vec![
                FundsWithdrawn {
                    model: next,
                    cents: *cents,
                }
                .into(),
            ]),
        }
    }
}

pub fn serializer() -> JsonSerializer<AccountEvent> {
    JsonSerializer::builder()
        .register::<AccountOpened>()
        .register::<FundsDeposited>()
        .register::<FundsWithdrawn>()
        .build()
}

pub fn open(id: &str, owner: &str) -> AccountCommand {
    AccountCommand::Open {
        model: CommandModel::new(id),
        owner: owner.to_string(),
    }
}

pub fn deposit(id: &str, cents: i64) -> AccountCommand {
    AccountCommand::Deposit {
        model: CommandModel::new(id),
        cents,
    }
}

pub fn withdraw(id: &str, cents: i64) -> AccountCommand {
    AccountCommand::Withdraw {
        model: CommandModel::new(id),
        cents,
    }
}

pub fn audit(id: &str) -> AccountCommand {
    AccountCommand::Audit(CommandModel::new(id))
}

pub fn opened(id: &str, version: i64, owner: &str) -> AccountEvent {
    AccountOpened {
        model: EventModel::new(id, Version::new(version)),
        owner: owner.to_string(),
    }
    .into()
}

pub fn deposited(id: &str, version: i64, cents: i64) -> AccountEvent {
    FundsDeposited {
        model: EventModel::new(id, Version::new(version)),
        cents,
    }
    .into()
}

pub fn withdrawn(id: &str, version: i64, cents: i64) -> AccountEvent {
    FundsWithdrawn {
        model: EventModel::new(id, Version::new(version)),
        cents,
    }
    .into()
}
