//! orbit core: transport-agnostic wire model, error taxonomy, and the remote
//! operation contract shared by the gateway and every client binding.
//!
//! This crate defines the message shapes and the single operation table that
//! the blocking client, the callback client, the in-process adapter, and the
//! server dispatcher all derive from. It carries no runtime or transport
//! dependencies so it can be reused in every one of those contexts.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Malformed input always surfaces as an `RpcError` with a stable code.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod codec;
pub mod contract;
pub mod error;
pub mod message;
pub mod transport;
pub mod types;
pub mod wire;

pub use contract::{
    AsyncCaller, AsyncControl, AsyncGameplay, Caller, Control, ControlRequest, Gameplay,
    GameplayRequest, OpId, Request,
};
pub use error::{BatchError, ErrorCode, RpcError, RpcResult};
pub use message::{Array, Message, MessageError, Record, Value};
pub use transport::{AsyncTransport, Callback, Immediate, ResultCallback, Scheduler, Transport};
pub use wire::{Reply, Snapshot, WireValue};
