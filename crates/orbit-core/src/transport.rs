//! Transport and scheduling seams used by client bindings.
//!
//! A transport moves one structured message to the server and brings one
//! back. It knows nothing about operations, batches, or sessions; those live
//! in the bindings built on top of it.

use std::sync::Arc;

use crate::error::{ErrorCode, RpcError, RpcResult};
use crate::message::Message;

/// Typed completion handed to a callback-style operation.
pub type Callback<R> = Box<dyn FnOnce(RpcResult<R>) + Send + 'static>;

/// Raw completion of one transport exchange.
pub type ResultCallback = Box<dyn FnOnce(RpcResult<Message>) + Send + 'static>;

/// Request/response exchange that blocks the caller.
///
/// Failure to complete the exchange is reported as a TRANSPORT error; a
/// server-side failure arrives as an ordinary `ERROR` message.
pub trait Transport {
    fn query(&mut self, request: Message) -> RpcResult<Message>;

    /// Deliver `message` without waiting for a reply.
    fn send(&mut self, message: Message) -> RpcResult<()>;

    /// Answer `request` with an error envelope instead of a response.
    fn error(&mut self, request: &Message, code: ErrorCode, detail: &str) -> RpcResult<()> {
        let envelope = RpcError::new(code, detail)
            .with_cause(format!("in reply to {}", request.name()))
            .to_record();
        self.send(Message::Record(envelope))
    }
}

/// Request/response exchange that completes through a callback.
///
/// The result is delivered exactly once, on `scheduler`.
pub trait AsyncTransport {
    fn query_async(&self, request: Message, scheduler: Arc<dyn Scheduler>, on_result: ResultCallback);
}

/// Executor that callback bindings deliver results on.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, task: Box<dyn FnOnce() + Send + 'static>);
}

/// Runs every task inline on the scheduling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct Immediate;

impl Scheduler for Immediate {
    fn schedule(&self, task: Box<dyn FnOnce() + Send + 'static>) {
        task();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::message::Record;

    #[derive(Default)]
    struct Outbox {
        sent: Vec<Message>,
    }

    impl Transport for Outbox {
        fn query(&mut self, request: Message) -> RpcResult<Message> {
            self.send(request)?;
            Err(RpcError::transport("no peer"))
        }

        fn send(&mut self, message: Message) -> RpcResult<()> {
            self.sent.push(message);
            Ok(())
        }
    }

    #[test]
    fn error_answers_with_an_envelope() {
        let mut outbox = Outbox::default();
        let request = Message::Record(Record::new("GET_TURN"));
        outbox
            .error(&request, ErrorCode::NoGameRunning, "no game is running")
            .unwrap();

        let [Message::Record(envelope)] = outbox.sent.as_slice() else {
            unreachable!("expected one record");
        };
        let err = RpcError::from_record(envelope);
        assert_eq!(err.code(), ErrorCode::NoGameRunning);
        assert_eq!(err.detail(), "no game is running");
        assert_eq!(err.cause(), Some("in reply to GET_TURN"));
    }

    #[test]
    fn immediate_runs_inline() {
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = hits.clone();
        Immediate.schedule(Box::new(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
