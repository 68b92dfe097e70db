//! Structured messages: the named, self-describing values every request,
//! response, and error travels as.
//!
//! A top-level exchange is always a [`Message`]: either a named [`Record`]
//! (field map) or a named [`Array`] (ordered items). Typed field access goes
//! through [`WireValue`](crate::wire::WireValue) and fails with
//! [`MessageError::MissingAttribute`] when a field is absent or has the wrong
//! shape.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::wire::WireValue;

/// Field-level decode failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error("{record}: missing or mismatched attribute `{field}` (expected {expected})")]
    MissingAttribute {
        record: String,
        field: String,
        expected: &'static str,
    },
    #[error("expected message `{expected}`, got `{actual}`")]
    UnexpectedName { expected: String, actual: String },
}

/// Any value that may appear inside a record or array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Record(Record),
    Array(Array),
}

impl Value {
    /// Short description of the value's shape, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Record(_) => "record",
            Value::Array(_) => "array",
        }
    }

    /// Lift a nested record or array back into a top-level message.
    pub fn into_message(self) -> Option<Message> {
        match self {
            Value::Record(record) => Some(Message::Record(record)),
            Value::Array(array) => Some(Message::Array(array)),
            _ => None,
        }
    }
}

impl From<Message> for Value {
    fn from(message: Message) -> Self {
        match message {
            Message::Record(record) => Value::Record(record),
            Message::Array(array) => Value::Array(array),
        }
    }
}

/// Named field mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Record {
    name: String,
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field insertion.
    pub fn with(mut self, field: impl Into<String>, value: Value) -> Self {
        self.fields.insert(field.into(), value);
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.values()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Name check used before decoding a reply.
    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    pub fn expect_name(&self, name: &str) -> Result<(), MessageError> {
        if self.is(name) {
            Ok(())
        } else {
            Err(MessageError::UnexpectedName {
                expected: name.to_string(),
                actual: self.name.clone(),
            })
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn raw(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Typed read. Absent and mismatched fields are both `MissingAttribute`.
    pub fn get<T: WireValue>(&self, field: &str) -> Result<T, MessageError> {
        self.fields
            .get(field)
            .and_then(T::from_value)
            .ok_or_else(|| MessageError::MissingAttribute {
                record: self.name.clone(),
                field: field.to_string(),
                expected: T::KIND,
            })
    }

    /// Typed read of an optional field: absent is `None`, mismatched is an error.
    pub fn get_opt<T: WireValue>(&self, field: &str) -> Result<Option<T>, MessageError> {
        if self.contains(field) {
            self.get(field).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Named ordered sequence; used for lists and batches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Array {
    name: String,
    items: Vec<Value>,
}

impl Array {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
        }
    }

    pub fn from_items(name: impl Into<String>, items: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            items,
        }
    }

    pub fn push(&mut self, value: Value) {
        self.items.push(value);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Value> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Top-level unit of every exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
    Record(Record),
    Array(Array),
}

impl Message {
    pub fn name(&self) -> &str {
        match self {
            Message::Record(record) => record.name(),
            Message::Array(array) => array.name(),
        }
    }
}

impl From<Record> for Message {
    fn from(record: Record) -> Self {
        Message::Record(record)
    }
}

impl From<Array> for Message {
    fn from(array: Array) -> Self {
        Message::Array(array)
    }
}
