//! Typed ledger events
//!
//! The ledger emits a closed set of events. Each variant has a fixed field
//! set that is registered once when the [`Emitter`] is built and re-checked
//! against the registry before every mutation that will emit it.

use crate::events::{EventError, EventRecord, EventRegistry, EventSink, FieldValue};
use crate::ledger::Amount;
use std::collections::BTreeMap;

/// Kinds of ledger events
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Transfer,
    Mint,
    Burn,
}

impl EventKind {
    /// All kinds, in registration order
    pub const ALL: [EventKind; 3] = [EventKind::Transfer, EventKind::Mint, EventKind::Burn];

    /// Registered event name
    pub fn name(self) -> &'static str {
        match self {
            EventKind::Transfer => "transfer",
            EventKind::Mint => "mint",
            EventKind::Burn => "burn",
        }
    }

    /// Declared field names
    pub fn fields(self) -> &'static [&'static str] {
        match self {
            EventKind::Transfer => &["sender", "to", "amount"],
            EventKind::Mint | EventKind::Burn => &["sender", "amount", "new_balance", "old_supply"],
        }
    }
}

/// A ledger event with its typed payload
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Transfer {
        sender: String,
        to: String,
        amount: Amount,
    },
    Mint {
        sender: String,
        amount: Amount,
        new_balance: Amount,
        old_supply: Amount,
    },
    Burn {
        sender: String,
        amount: Amount,
        new_balance: Amount,
        old_supply: Amount,
    },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Transfer { .. } => EventKind::Transfer,
            Event::Mint { .. } => EventKind::Mint,
            Event::Burn { .. } => EventKind::Burn,
        }
    }

    /// Payload as a name -> value map
    pub fn fields(&self) -> BTreeMap<String, FieldValue> {
        let mut fields = BTreeMap::new();
        match self {
            Event::Transfer { sender, to, amount } => {
                fields.insert("sender".to_string(), sender.as_str().into());
                fields.insert("to".to_string(), to.as_str().into());
                fields.insert("amount".to_string(), (*amount).into());
            }
            Event::Mint {
                sender,
                amount,
                new_balance,
                old_supply,
            }
            | Event::Burn {
                sender,
                amount,
                new_balance,
                old_supply,
            } => {
                fields.insert("sender".to_string(), sender.as_str().into());
                fields.insert("amount".to_string(), (*amount).into());
                fields.insert("new_balance".to_string(), (*new_balance).into());
                fields.insert("old_supply".to_string(), (*old_supply).into());
            }
        }
        fields
    }
}

/// Validates typed events against a registry and hands them to a sink
#[derive(Debug)]
pub struct Emitter<S> {
    registry: EventRegistry,
    sink: S,
}

impl<S: EventSink> Emitter<S> {
    /// Create an emitter with every [`EventKind`] registered
    pub fn new(sink: S) -> Self {
        let mut registry = EventRegistry::new();
        for kind in EventKind::ALL {
            registry.register(kind.name(), kind.fields().iter().copied());
        }
        Self::with_registry(registry, sink)
    }

    /// Create an emitter over a caller-provided registry
    pub fn with_registry(registry: EventRegistry, sink: S) -> Self {
        Self { registry, sink }
    }

    /// Check that `kind` is registered with its expected field set
    pub fn ensure(&self, kind: EventKind) -> Result<(), EventError> {
        self.registry.check(kind.name(), kind.fields().iter().copied())
    }

    /// Validate `event` and publish it to the sink
    pub fn emit(&mut self, event: Event) -> Result<EventRecord, EventError> {
        let name = event.kind().name();
        let handle = self
            .registry
            .handle(name)
            .ok_or_else(|| EventError::Unregistered(name.to_string()))?;

        let record = self.registry.record(&handle, event.fields())?;
        self.sink.publish(&record);
        Ok(record)
    }

    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut EventRegistry {
        &mut self.registry
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}
