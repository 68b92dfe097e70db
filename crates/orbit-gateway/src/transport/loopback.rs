//! In-process transport.
//!
//! Carries messages between a client binding and a [`Dispatcher`] without a
//! socket. Every message is still encoded to bytes and decoded again on each
//! side, so the loopback exercises the same codec as the WebSocket endpoint.
//! Each transport instance is one connection with its own session.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;

use orbit_core::{
    codec, AsyncTransport, Message, ResultCallback, RpcError, RpcResult, Scheduler, Transport,
};

use crate::dispatch::{Connection, Dispatcher};

#[derive(Clone)]
pub struct LoopbackTransport {
    dispatcher: Arc<Dispatcher>,
    connection: Connection,
    runtime: Handle,
    exchanges: Arc<AtomicUsize>,
    connected: Arc<AtomicBool>,
}

impl LoopbackTransport {
    pub fn new(dispatcher: Arc<Dispatcher>, runtime: Handle) -> Self {
        let connection = dispatcher.connect();
        Self {
            dispatcher,
            connection,
            runtime,
            exchanges: Arc::new(AtomicUsize::new(0)),
            connected: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Completed or attempted round trips so far.
    pub fn exchanges(&self) -> usize {
        self.exchanges.load(Ordering::SeqCst)
    }

    /// Drop the link; later exchanges fail with TRANSPORT.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    fn check_connected(&self) -> RpcResult<()> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RpcError::transport("loopback link is down"))
        }
    }
}

async fn exchange(
    dispatcher: Arc<Dispatcher>,
    connection: Connection,
    request: Message,
) -> RpcResult<Message> {
    let outbound = codec::to_bytes(&request)?;
    let reply = match codec::from_bytes(&outbound) {
        Ok(inbound) => dispatcher.handle(&connection, inbound).await,
        Err(err) => Message::Record(err.to_record()),
    };
    let inbound = codec::to_bytes(&reply)?;
    codec::from_bytes(&inbound)
}

impl Transport for LoopbackTransport {
    /// Blocks on the runtime. Only threads outside any tokio runtime may
    /// call it: runtime workers and `spawn_blocking` threads alike get
    /// TRANSPORT, since tokio does not tell the two apart. Code running on a
    /// runtime uses [`AsyncTransport::query_async`] instead.
    fn query(&mut self, request: Message) -> RpcResult<Message> {
        self.check_connected()?;
        if Handle::try_current().is_ok() {
            return Err(RpcError::transport(
                "blocking query issued from inside an async runtime",
            ));
        }
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        self.runtime.block_on(exchange(
            Arc::clone(&self.dispatcher),
            self.connection.clone(),
            request,
        ))
    }

    /// The reply is dropped when it arrives.
    fn send(&mut self, message: Message) -> RpcResult<()> {
        self.check_connected()?;
        self.exchanges.fetch_add(1, Ordering::SeqCst);

        let dispatcher = Arc::clone(&self.dispatcher);
        let connection = self.connection.clone();
        self.runtime.spawn(async move {
            if let Err(err) = exchange(dispatcher, connection, message).await {
                tracing::debug!(code = %err.code(), "one-way message failed");
            }
        });
        Ok(())
    }
}

impl AsyncTransport for LoopbackTransport {
    fn query_async(&self, request: Message, scheduler: Arc<dyn Scheduler>, on_result: ResultCallback) {
        if let Err(err) = self.check_connected() {
            scheduler.schedule(Box::new(move || on_result(Err(err))));
            return;
        }
        self.exchanges.fetch_add(1, Ordering::SeqCst);

        let dispatcher = Arc::clone(&self.dispatcher);
        let connection = self.connection.clone();
        self.runtime.spawn(async move {
            let result = exchange(dispatcher, connection, request).await;
            scheduler.schedule(Box::new(move || on_result(result)));
        });
    }
}
