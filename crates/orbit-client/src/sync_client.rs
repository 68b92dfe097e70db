//! Blocking client binding.
//!
//! Exactly one transport exchange per call; no caching, no retry. Void
//! operations accept the documented acknowledgement set, value operations
//! require the documented response name, and list operations decode every
//! element or fail as a whole.

use orbit_core::wire::decode_response;
use orbit_core::{Caller, Message, Reply, Request, RpcResult, Transport};

pub struct SyncClient<T> {
    transport: T,
}

impl<T: Transport> SyncClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }
}

impl<T: Transport> Caller for SyncClient<T> {
    fn call<R: Reply>(&mut self, request: Request) -> RpcResult<R> {
        let op = request.op();
        tracing::trace!(op = op.request_name(), "query");
        let reply = self.transport.query(Message::Record(request.to_record()))?;
        decode_response(reply, op.response_name())
    }
}
