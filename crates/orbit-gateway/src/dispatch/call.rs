//! Deferred calls.
//!
//! A decoded request becomes a [`DeferredCall`]: `run` executes it against a
//! [`CallTarget`] (normally on the logic thread), `into_wire` encodes the
//! outcome for the network side, `get` yields the outcome itself. A call
//! holds at most one outcome; running it twice is rejected.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use orbit_core::contract::BATCH_RESPONSE;
use orbit_core::{Array, Message, OpId, Request, RpcError, RpcResult, Value};

/// Anything a decoded request can run against.
pub trait CallTarget {
    fn execute(&mut self, request: Request) -> RpcResult<Message>;
}

pub struct SingleCall {
    op: OpId,
    request: Option<Request>,
    outcome: Option<RpcResult<Message>>,
}

impl SingleCall {
    pub fn new(request: Request) -> Self {
        Self {
            op: request.op(),
            request: Some(request),
            outcome: None,
        }
    }

    pub fn op(&self) -> OpId {
        self.op
    }

    /// Execute once. Panics inside the target become SERVER_BUG outcomes.
    pub fn run<T: CallTarget + ?Sized>(&mut self, target: &mut T) -> RpcResult<()> {
        let Some(request) = self.request.take() else {
            return Err(RpcError::server_bug(format!(
                "{} executed twice",
                self.op.request_name()
            )));
        };

        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| target.execute(request))) {
            Ok(outcome) => outcome,
            Err(payload) => Err(RpcError::server_bug("uncaught failure during execution")
                .with_cause(panic_message(payload.as_ref()))),
        };

        if let Err(err) = &outcome {
            if err.code() == orbit_core::ErrorCode::ServerBug {
                tracing::error!(
                    op = self.op.request_name(),
                    detail = err.detail(),
                    cause = err.cause().unwrap_or(""),
                    "server bug"
                );
            }
        }
        self.outcome = Some(outcome);
        Ok(())
    }

    pub fn is_done(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, Some(Ok(_)))
    }

    /// Response message, or its error envelope.
    pub fn into_wire(self) -> Message {
        match self.get() {
            Ok(message) => message,
            Err(err) => Message::Record(err.to_record()),
        }
    }

    pub fn get(self) -> RpcResult<Message> {
        self.outcome.unwrap_or_else(|| {
            Err(RpcError::server_bug(format!(
                "{} was never executed",
                self.op.request_name()
            )))
        })
    }
}

/// Ordered calls; execution stops at the first failure.
pub struct BatchCall {
    calls: Vec<SingleCall>,
    ran: bool,
}

impl BatchCall {
    pub fn new(calls: Vec<SingleCall>) -> Self {
        Self { calls, ran: false }
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn run<T: CallTarget + ?Sized>(&mut self, target: &mut T) -> RpcResult<()> {
        if self.ran {
            return Err(RpcError::server_bug("batch executed twice"));
        }
        self.ran = true;
        for call in &mut self.calls {
            call.run(target)?;
            if !call.succeeded() {
                break;
            }
        }
        Ok(())
    }

    /// One entry per attempted call; the tail that never ran is absent.
    pub fn into_wire(self) -> Message {
        let items = self
            .calls
            .into_iter()
            .take_while(SingleCall::is_done)
            .map(|call| Value::from(call.into_wire()))
            .collect();
        Message::Array(Array::from_items(BATCH_RESPONSE, items))
    }
}

pub enum DeferredCall {
    Single(SingleCall),
    Batch(BatchCall),
}

impl DeferredCall {
    /// Operation name for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            DeferredCall::Single(call) => call.op().request_name(),
            DeferredCall::Batch(_) => orbit_core::contract::BATCH,
        }
    }

    /// Operation names in request order, one per batch item.
    pub fn op_names(&self) -> Vec<&'static str> {
        match self {
            DeferredCall::Single(call) => vec![call.op().request_name()],
            DeferredCall::Batch(batch) => batch
                .calls
                .iter()
                .map(|call| call.op().request_name())
                .collect(),
        }
    }

    pub fn run<T: CallTarget + ?Sized>(&mut self, target: &mut T) -> RpcResult<()> {
        match self {
            DeferredCall::Single(call) => call.run(target),
            DeferredCall::Batch(batch) => batch.run(target),
        }
    }

    pub fn into_wire(self) -> Message {
        match self {
            DeferredCall::Single(call) => call.into_wire(),
            DeferredCall::Batch(batch) => batch.into_wire(),
        }
    }

    /// A batch always yields its response array, even when an entry failed.
    pub fn get(self) -> RpcResult<Message> {
        match self {
            DeferredCall::Single(call) => call.get(),
            DeferredCall::Batch(batch) => Ok(batch.into_wire()),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use orbit_core::{ControlRequest, ErrorCode, GameplayRequest};

    use super::*;
    use crate::test_support::record;

    /// Counts executions; fails on MOVE_FLEET, panics on SURRENDER.
    #[derive(Default)]
    struct Counter {
        executed: usize,
    }

    impl CallTarget for Counter {
        fn execute(&mut self, request: Request) -> RpcResult<Message> {
            self.executed += 1;
            match request {
                Request::Gameplay(GameplayRequest::MoveFleet { .. }) => {
                    Err(RpcError::game("fleet is docked"))
                }
                Request::Gameplay(GameplayRequest::Surrender {}) => panic!("boom"),
                other => Ok(Message::Record(orbit_core::Record::new(
                    other.op().response_name(),
                ))),
            }
        }
    }

    fn ping() -> SingleCall {
        SingleCall::new(Request::Control(ControlRequest::Ping {}))
    }

    fn move_fleet() -> SingleCall {
        SingleCall::new(Request::Gameplay(GameplayRequest::MoveFleet { fleet: 1, x: 2, y: 3 }))
    }

    #[test]
    fn single_call_runs_once() {
        let mut target = Counter::default();
        let mut call = ping();
        assert!(!call.is_done());
        call.run(&mut target).unwrap();
        let err = call.run(&mut target).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ServerBug);
        assert_eq!(target.executed, 1);
        assert!(record(&call.into_wire()).is("PONG"));
    }

    #[test]
    fn panics_become_server_bug_envelopes() {
        let mut target = Counter::default();
        let mut call = SingleCall::new(Request::Gameplay(GameplayRequest::Surrender {}));
        call.run(&mut target).unwrap();
        let err = call.get().unwrap_err();
        assert_eq!(err.code(), ErrorCode::ServerBug);
        assert_eq!(err.cause(), Some("boom"));
    }

    #[test]
    fn batch_stops_at_the_first_failure() {
        let mut target = Counter::default();
        let mut batch = BatchCall::new(vec![ping(), ping(), move_fleet(), ping(), ping()]);
        batch.run(&mut target).unwrap();
        assert_eq!(target.executed, 3);

        let Message::Array(reply) = batch.into_wire() else {
            panic!("expected array");
        };
        assert!(reply.is(BATCH_RESPONSE));
        assert_eq!(reply.len(), 3);
        let Value::Record(last) = &reply.items()[2] else {
            panic!("expected record");
        };
        assert_eq!(RpcError::from_record(last), RpcError::game("fleet is docked"));
    }

    #[test]
    fn op_names_list_every_batch_item() {
        let batch = DeferredCall::Batch(BatchCall::new(vec![ping(), move_fleet()]));
        assert_eq!(batch.op_names(), vec!["PING", "MOVE_FLEET"]);
        assert_eq!(batch.label(), "BATCH");
        assert_eq!(DeferredCall::Single(ping()).op_names(), vec!["PING"]);
    }

    #[test]
    fn unexecuted_single_call_is_a_server_bug() {
        assert_eq!(ping().get().unwrap_err().code(), ErrorCode::ServerBug);
    }
}
