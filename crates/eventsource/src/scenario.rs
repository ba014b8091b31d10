//! Given/when/then checks for command handlers.
//!
//! ```ignore
//! Scenario::<Order>::new()
//!     .given([created])
//!     .when(ship(id))
//!     .then([shipped]);
//! ```
//!
//! `then` compares events by type plus the fields the expected event sets.
//! Fields left at their zero value (null, false, 0, empty string, empty
//! collection, the Unix epoch) are not checked, so tests only spell out what
//! matters to them.
//!
//! Timestamps are compared as their JSON text, so a string field whose
//! expected value is exactly `1970-01-01T00:00:00Z` is skipped as well.
//! Use [`Scenario::run`] and assert directly when that text matters.

use serde_json::Value;

use crate::aggregate::CommandHandler;
use crate::event::DomainEvent;

/// How a default `DateTime<Utc>` encodes. Any expected string with this
/// text counts as unset, whether or not the field is a timestamp.
const EPOCH: &str = "1970-01-01T00:00:00Z";

/// A command run against an aggregate rebuilt from `given` events.
pub struct Scenario<A: CommandHandler> {
    given: Vec<A::Event>,
    command: Option<A::Command>,
}

impl<A: CommandHandler> Default for Scenario<A> {
    fn default() -> Self {
        Self {
            given: Vec::new(),
            command: None,
        }
    }
}

impl<A: CommandHandler> Scenario<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends events to the starting history. May be called repeatedly.
    pub fn given(mut self, events: impl IntoIterator<Item = A::Event>) -> Self {
        self.given.extend(events);
        self
    }

    /// Sets the command under test.
    pub fn when(mut self, command: A::Command) -> Self {
        self.command = Some(command);
        self
    }

    /// Folds the given events into a fresh aggregate and handles the command.
    ///
    /// Panics if a given event is rejected or no command was set.
    #[track_caller]
    pub fn run(&self) -> Result<Vec<A::Event>, A::Error> {
        let mut aggregate = A::default();
        for event in &self.given {
            if let Err(e) = aggregate.on(event) {
                panic!("given event {} was rejected: {e}", event.event_type());
            }
        }
        let Some(command) = &self.command else {
            panic!("scenario has no command; call when() first");
        };
        aggregate.handle(command)
    }

    /// Asserts that the command succeeds with events matching `expected`.
    #[track_caller]
    pub fn then(&self, expected: impl IntoIterator<Item = A::Event>) {
        let actual = match self.run() {
            Ok(events) => events,
            Err(e) => panic!("got error {e}; want events"),
        };
        let expected: Vec<_> = expected.into_iter().collect();
        if actual.len() != expected.len() {
            panic!("got {} events; want {}", actual.len(), expected.len());
        }

        for (index, (want, got)) in expected.iter().zip(&actual).enumerate() {
            if want.event_type() != got.event_type() {
                panic!(
                    "event {index}: got {}; want {}",
                    got.event_type(),
                    want.event_type()
                );
            }
            let (want_payload, got_payload) = match (want.payload(), got.payload()) {
                (Ok(w), Ok(g)) => (w, g),
                (Err(e), _) | (_, Err(e)) => panic!("event {index}: unable to encode: {e}"),
            };
            if let Err(mismatch) = compare_set_fields(&want_payload, &got_payload, "") {
                panic!("event {index} ({}): {mismatch}", want.event_type());
            }
        }
    }

    /// Asserts that the command fails with an error accepted by `matches`.
    #[track_caller]
    pub fn then_error(&self, matches: impl FnOnce(&A::Error) -> bool) {
        match self.run() {
            Ok(events) => panic!("got {} events; want an error", events.len()),
            Err(e) => {
                if !matches(&e) {
                    panic!("error did not match: {e}");
                }
            }
        }
    }
}

fn is_zero(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty() || s == EPOCH,
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.values().all(is_zero),
    }
}

/// Checks every non-zero field of `want` against `got`, recursing into
/// objects. Arrays and scalars must match exactly.
fn compare_set_fields(want: &Value, got: &Value, path: &str) -> Result<(), String> {
    if is_zero(want) {
        return Ok(());
    }

    let Value::Object(fields) = want else {
        if want == got {
            return Ok(());
        }
        return Err(format!("{}: got {got}; want {want}", display_path(path)));
    };

    for (name, expected) in fields {
        let field_path = if path.is_empty() {
            name.clone()
        } else {
            format!("{path}.{name}")
        };
        let actual = got.get(name).unwrap_or(&Value::Null);
        compare_set_fields(expected, actual, &field_path)?;
    }
    Ok(())
}

fn display_path(path: &str) -> &str {
    if path.is_empty() { "value" } else { path }
}
