//! Text codec for structured messages.
//!
//! One message is one JSON document. The gateway carries it in a single
//! WebSocket text frame; the loopback transport carries the same bytes in
//! memory. Anything that does not parse into a [`Message`] is a FORMAT error.

use bytes::Bytes;

use crate::error::{RpcError, RpcResult};
use crate::message::{Message, Value};

pub fn encode(message: &Message) -> RpcResult<String> {
    check_finite(message)?;
    serde_json::to_string(message).map_err(|e| RpcError::format(format!("encode: {e}")))
}

pub fn decode(text: &str) -> RpcResult<Message> {
    serde_json::from_str(text).map_err(|e| RpcError::format(format!("decode: {e}")))
}

pub fn to_bytes(message: &Message) -> RpcResult<Bytes> {
    check_finite(message)?;
    serde_json::to_vec(message)
        .map(Bytes::from)
        .map_err(|e| RpcError::format(format!("encode: {e}")))
}

pub fn from_bytes(bytes: &[u8]) -> RpcResult<Message> {
    serde_json::from_slice(bytes).map_err(|e| RpcError::format(format!("decode: {e}")))
}

/// JSON has no NaN or infinities; they would come back as `null`.
fn check_finite(message: &Message) -> RpcResult<()> {
    let finite = match message {
        Message::Record(record) => record.values().all(is_finite),
        Message::Array(array) => array.items().iter().all(is_finite),
    };
    if finite {
        Ok(())
    } else {
        Err(RpcError::format(format!(
            "encode: {} carries a non-finite float",
            message.name()
        )))
    }
}

fn is_finite(value: &Value) -> bool {
    match value {
        Value::Float(f) => f.is_finite(),
        Value::Record(record) => record.values().all(is_finite),
        Value::Array(array) => array.items().iter().all(is_finite),
        _ => true,
    }
}
