//! Transport layer: WebSocket endpoint and in-process loopback.

pub mod codec;
pub mod loopback;
pub mod ws;

pub use loopback::LoopbackTransport;
