//! Typed views over structured messages.
//!
//! - [`WireValue`]: a Rust value that maps onto a single [`Value`].
//! - [`Snapshot`]: a typed status record (fleet, planet, battle, ...).
//! - [`Reply`]: the return type of a contract operation and how it is shaped
//!   as a response message.
//!
//! Decoding never panics; a mismatch is reported as a FORMAT [`RpcError`].

use crate::error::{RpcError, RpcResult, ERROR_RECORD};
use crate::message::{Array, Message, MessageError, Record, Value};

/// Acknowledgements a void operation accepts besides its own response name.
pub const ACKNOWLEDGEMENTS: [&str; 2] = ["OK", "ACK"];

/// Field carrying a scalar reply.
pub const VALUE_FIELD: &str = "value";

/// A Rust value with a single-value wire form.
pub trait WireValue: Sized {
    /// Human-readable shape name, used in decode diagnostics and as the name
    /// of arrays built from `Vec<Self>`.
    const KIND: &'static str;

    fn to_value(&self) -> Value;

    fn from_value(value: &Value) -> Option<Self>;
}

impl WireValue for bool {
    const KIND: &'static str = "bool";

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl WireValue for i64 {
    const KIND: &'static str = "int";

    fn to_value(&self) -> Value {
        Value::Int(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl WireValue for i32 {
    const KIND: &'static str = "int32";

    fn to_value(&self) -> Value {
        Value::Int(i64::from(*self))
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(i) => i32::try_from(*i).ok(),
            _ => None,
        }
    }
}

impl WireValue for f64 {
    const KIND: &'static str = "float";

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(f) => Some(*f),
            // Whole floats may arrive as integers after a text round trip.
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl WireValue for String {
    const KIND: &'static str = "string";

    fn to_value(&self) -> Value {
        Value::Str(self.clone())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Str(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl<T: WireValue> WireValue for Vec<T> {
    const KIND: &'static str = "list";

    fn to_value(&self) -> Value {
        Value::Array(Array::from_items(
            T::KIND,
            self.iter().map(WireValue::to_value).collect(),
        ))
    }

    /// All-or-nothing: one bad element rejects the whole list.
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Array(array) => array.items().iter().map(T::from_value).collect(),
            _ => None,
        }
    }
}

/// A typed status record.
pub trait Snapshot: WireValue {
    /// Record name used when the snapshot is nested or replied on its own.
    const NAME: &'static str;

    fn to_record(&self) -> Record;

    fn from_record(record: &Record) -> Result<Self, MessageError>;
}

/// Return type of a contract operation.
pub trait Reply: Sized {
    /// Shape `self` as the response named `name`.
    fn into_reply(self, name: &str) -> Message;

    /// Decode a (non-error) response that should be named `name`.
    fn from_reply(message: Message, name: &str) -> RpcResult<Self>;
}

impl Reply for () {
    fn into_reply(self, name: &str) -> Message {
        Message::Record(Record::new(name))
    }

    fn from_reply(message: Message, name: &str) -> RpcResult<Self> {
        match message {
            Message::Record(record)
                if record.is(name) || ACKNOWLEDGEMENTS.contains(&record.name()) =>
            {
                Ok(())
            }
            other => Err(unexpected(name, &other)),
        }
    }
}

macro_rules! scalar_reply {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Reply for $ty {
                fn into_reply(self, name: &str) -> Message {
                    Message::Record(Record::new(name).with(VALUE_FIELD, WireValue::to_value(&self)))
                }

                fn from_reply(message: Message, name: &str) -> RpcResult<Self> {
                    let record = expect_record(message, name)?;
                    Ok(record.get::<$ty>(VALUE_FIELD)?)
                }
            }
        )*
    };
}

scalar_reply!(bool, i64, i32, f64, String);

impl<S: Snapshot> Reply for Vec<S> {
    fn into_reply(self, name: &str) -> Message {
        Message::Array(Array::from_items(
            name,
            self.iter().map(|s| Value::Record(s.to_record())).collect(),
        ))
    }

    fn from_reply(message: Message, name: &str) -> RpcResult<Self> {
        match message {
            Message::Array(array) if array.is(name) => array
                .items()
                .iter()
                .enumerate()
                .map(|(index, item)| match item {
                    Value::Record(record) => S::from_record(record).map_err(|e| {
                        RpcError::format(format!("{name}[{index}]: {e}"))
                    }),
                    other => Err(RpcError::format(format!(
                        "{name}[{index}]: expected {} record, got {}",
                        S::NAME,
                        other.kind()
                    ))),
                })
                .collect(),
            other => Err(unexpected(name, &other)),
        }
    }
}

/// Decode a record reply named `name`.
pub fn expect_record(message: Message, name: &str) -> RpcResult<Record> {
    match message {
        Message::Record(record) if record.is(name) => Ok(record),
        other => Err(unexpected(name, &other)),
    }
}

/// Decode any response: error envelopes become `Err`, everything else goes
/// through `R`'s reply decoding against `name`.
pub fn decode_response<R: Reply>(message: Message, name: &str) -> RpcResult<R> {
    match message {
        Message::Record(record) if record.is(ERROR_RECORD) => Err(RpcError::from_record(&record)),
        other => R::from_reply(other, name),
    }
}

fn unexpected(expected: &str, got: &Message) -> RpcError {
    let shape = match got {
        Message::Record(_) => "record",
        Message::Array(_) => "array",
    };
    RpcError::format(format!(
        "expected response {expected}, got {shape} {}",
        got.name()
    ))
}
