//! WebSocket handler.
//!
//! Responsibilities:
//! - Upgrade HTTP -> WS on `/v1/rpc`
//! - One Session Adapter per socket, created logged-out
//! - Lifecycle: ping interval + idle timeout
//! - One reply per request frame, written in request order

use axum::{
    extract::{ws::Message as Frame, ws::WebSocket, ws::WebSocketUpgrade, State},
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::time::{Duration, Instant};
use tracing::Instrument;

use orbit_core::{Message, RpcError};

use crate::app_state::AppState;
use crate::transport::codec::{self, Inbound};

pub async fn ws_upgrade(State(app): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let max = app.cfg().server.max_frame_bytes;
    ws.max_message_size(max).on_upgrade(move |socket| {
        let span = tracing::info_span!("rpc_session");
        run_session(app, socket).instrument(span)
    })
}

fn error_frame(err: &RpcError) -> Option<Frame> {
    codec::encode(&Message::Record(err.to_record())).ok()
}

async fn run_session(app: AppState, socket: WebSocket) {
    let dispatcher = app.dispatcher();
    let metrics = app.metrics();
    let conn = dispatcher.connect();
    metrics.connections_active.inc();
    tracing::info!("connection opened");

    let (mut ws_tx, mut ws_rx) = socket.split();

    let server = &app.cfg().server;
    let max_frame_bytes = server.max_frame_bytes;
    let idle_timeout = Duration::from_millis(server.idle_timeout_ms);
    let mut ping_tick = tokio::time::interval(Duration::from_millis(server.ping_interval_ms));
    ping_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut last_activity = Instant::now();

    loop {
        tokio::select! {
            incoming = ws_rx.next() => {
                let Some(Ok(frame)) = incoming else { break; };
                last_activity = Instant::now();

                let reply = match codec::decode(frame, max_frame_bytes) {
                    Ok(Inbound::Request(message)) => {
                        let reply = dispatcher.handle(&conn, message).await;
                        match codec::encode(&reply) {
                            Ok(frame) => Some(frame),
                            Err(err) => {
                                tracing::error!(detail = err.detail(), "reply encode failed");
                                error_frame(&RpcError::server_bug("reply could not be encoded"))
                            }
                        }
                    }
                    Ok(Inbound::Ping(payload)) => Some(Frame::Pong(payload)),
                    Ok(Inbound::Pong) => None,
                    Ok(Inbound::Close) => break,
                    Err(err) => {
                        metrics.observe_decode_error(&err.to_record());
                        error_frame(&err)
                    }
                };

                if let Some(frame) = reply {
                    if ws_tx.send(frame).await.is_err() {
                        break;
                    }
                }
            }

            _ = ping_tick.tick() => {
                if ws_tx.send(Frame::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }

            _ = tokio::time::sleep(Duration::from_millis(250)) => {
                if last_activity.elapsed() >= idle_timeout {
                    tracing::info!("idle timeout");
                    break;
                }
            }
        }
    }

    let _ = ws_tx.close().await;
    metrics.connections_active.dec();
    tracing::info!(participant = conn.participant().as_deref().unwrap_or("-"), "connection closed");
}
