//! Event schema registry
//!
//! Maps an event name to the exact set of field names it carries. Records
//! are only built for current registrations and only when the supplied
//! fields match the declared set.

use crate::ledger::Amount;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;

/// Event errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    #[error(
        "Event args ({}) do not match event definition ({}) of event {}",
        .got.join(", "),
        .expected.join(", "),
        .event
    )]
    SchemaMismatch {
        event: String,
        expected: Vec<String>,
        got: Vec<String>,
    },
    #[error("Event {0} is not registered")]
    Unregistered(String),
}

/// A single field value of an event record
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Amount(Amount),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<Amount> for FieldValue {
    fn from(value: Amount) -> Self {
        FieldValue::Amount(value)
    }
}

/// A schema-checked event, ready to hand to a sink.
///
/// Serializes to one flat JSON object:
/// `{"ts": "...", "event": "transfer", "sender": "A", "to": "B", "amount": 30}`
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EventRecord {
    pub ts: DateTime<Utc>,
    pub event: String,
    #[serde(flatten)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl EventRecord {
    /// Value of a field, if present
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Amount value of a field, if present and numeric
    pub fn amount(&self, name: &str) -> Option<Amount> {
        match self.fields.get(name) {
            Some(FieldValue::Amount(amount)) => Some(*amount),
            _ => None,
        }
    }

    /// Encode as a single JSON line
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Handle to one registration of an event.
///
/// Re-registering the same name invalidates every earlier handle.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EventHandle {
    name: String,
    id: u64,
}

impl EventHandle {
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Clone, Debug)]
struct Registration {
    id: u64,
    fields: BTreeSet<String>,
}

/// Event name -> declared field set
#[derive(Clone, Debug, Default)]
pub struct EventRegistry {
    events: HashMap<String, Registration>,
    next_id: u64,
}

impl EventRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `name` with the given field names, replacing any previous
    /// definition of the same name.
    pub fn register<I, S>(&mut self, name: &str, fields: I) -> EventHandle
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = self.next_id;
        self.next_id += 1;

        let fields = fields.into_iter().map(Into::into).collect();
        if self
            .events
            .insert(name.to_string(), Registration { id, fields })
            .is_some()
        {
            log::debug!("Event {} re-registered, previous handles are now stale", name);
        }

        EventHandle {
            name: name.to_string(),
            id,
        }
    }

    /// Current handle for `name`
    pub fn handle(&self, name: &str) -> Option<EventHandle> {
        self.events.get(name).map(|registration| EventHandle {
            name: name.to_string(),
            id: registration.id,
        })
    }

    /// Whether `handle` still refers to the live registration of its name
    pub fn is_current(&self, handle: &EventHandle) -> bool {
        self.events
            .get(&handle.name)
            .map_or(false, |registration| registration.id == handle.id)
    }

    /// Declared field names of `name`, sorted
    pub fn schema(&self, name: &str) -> Option<Vec<String>> {
        self.events
            .get(name)
            .map(|registration| registration.fields.iter().cloned().collect())
    }

    /// Check a field-name set against the declared schema of `name`
    pub fn check<'f, I>(&self, name: &str, field_names: I) -> Result<(), EventError>
    where
        I: IntoIterator<Item = &'f str>,
    {
        let registration = self
            .events
            .get(name)
            .ok_or_else(|| EventError::Unregistered(name.to_string()))?;

        let got: BTreeSet<String> = field_names.into_iter().map(str::to_string).collect();
        if got != registration.fields {
            return Err(EventError::SchemaMismatch {
                event: name.to_string(),
                expected: registration.fields.iter().cloned().collect(),
                got: got.into_iter().collect(),
            });
        }
        Ok(())
    }

    /// Build a timestamped record for `handle` from `fields`
    pub fn record(
        &self,
        handle: &EventHandle,
        fields: BTreeMap<String, FieldValue>,
    ) -> Result<EventRecord, EventError> {
        if !self.is_current(handle) {
            return Err(EventError::Unregistered(handle.name.clone()));
        }
        self.check(&handle.name, fields.keys().map(String::as_str))?;

        Ok(EventRecord {
            ts: Utc::now(),
            event: handle.name.clone(),
            fields,
        })
    }
}
