//! orbit gateway library entry.
//!
//! Server side of the RPC subsystem: configuration, the session registry and
//! per-connection Session Adapter, the game environment seam, deferred calls
//! and the single logic thread, the dispatcher, and the WebSocket and
//! in-process transports. Consumed by the binary (`main.rs`), by the client
//! crate's tests, and by the end-to-end tests.

pub mod app_state;
pub mod config;
pub mod dispatch;
pub mod environment;
pub mod obs;
pub mod ops;
pub mod router;
pub mod session;
pub mod transport;

#[cfg(test)]
mod test_support;
