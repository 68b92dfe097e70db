//! Frame codec for the WebSocket endpoint.
//!
//! - Text frames carry exactly one structured message (JSON)
//! - Binary frames are rejected
//! - Ping/Pong/Close are surfaced for lifecycle management

use axum::extract::ws::Message as Frame;

use orbit_core::{codec, Message, RpcError, RpcResult};

#[derive(Debug)]
pub enum Inbound {
    Request(Message),
    Ping(Vec<u8>),
    Pong,
    Close,
}

pub fn decode(frame: Frame, max_frame_bytes: usize) -> RpcResult<Inbound> {
    match frame {
        Frame::Text(s) => {
            if s.len() > max_frame_bytes {
                return Err(RpcError::format(format!(
                    "frame of {} bytes exceeds limit of {max_frame_bytes}",
                    s.len()
                )));
            }
            codec::decode(&s).map(Inbound::Request)
        }
        Frame::Binary(_) => Err(RpcError::format("binary frames are not supported")),
        Frame::Ping(v) => Ok(Inbound::Ping(v)),
        Frame::Pong(_) => Ok(Inbound::Pong),
        Frame::Close(_) => Ok(Inbound::Close),
    }
}

pub fn encode(message: &Message) -> RpcResult<Frame> {
    codec::encode(message).map(Frame::Text)
}
