//! Server dispatcher.
//!
//! Turns one inbound message into one reply:
//! - a record is a single request;
//! - an array named `BATCH` is a batch of requests, decoded all-or-nothing;
//! - anything else is UNKNOWN_MESSAGE.
//!
//! Execution runs on the logic thread when one is configured and inline
//! otherwise; encoding happens back on the calling task.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use orbit_core::contract::BATCH;
use orbit_core::{Message, Request, RpcError, RpcResult, Value};

use crate::environment::Environment;
use crate::obs::RpcMetrics;
use crate::session::{SessionAdapter, SessionRegistry};

use super::call::{BatchCall, DeferredCall, SingleCall};
use super::logic::LogicThread;

/// One client connection's session state.
#[derive(Clone)]
pub struct Connection {
    adapter: Arc<Mutex<SessionAdapter>>,
}

impl Connection {
    fn lock(&self) -> MutexGuard<'_, SessionAdapter> {
        self.adapter.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn participant(&self) -> Option<String> {
        self.lock().participant().map(str::to_string)
    }
}

pub struct Dispatcher {
    registry: Arc<SessionRegistry>,
    environment: Arc<dyn Environment>,
    protocol_version: String,
    logic: Option<LogicThread>,
    metrics: Arc<RpcMetrics>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<SessionRegistry>,
        environment: Arc<dyn Environment>,
        protocol_version: impl Into<String>,
        logic: Option<LogicThread>,
        metrics: Arc<RpcMetrics>,
    ) -> Self {
        Self {
            registry,
            environment,
            protocol_version: protocol_version.into(),
            logic,
            metrics,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn metrics(&self) -> &Arc<RpcMetrics> {
        &self.metrics
    }

    /// Fresh, logged-out session for a new connection.
    pub fn connect(&self) -> Connection {
        let adapter = SessionAdapter::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.environment),
            self.protocol_version.clone(),
        );
        Connection {
            adapter: Arc::new(Mutex::new(adapter)),
        }
    }

    /// Decode, execute, and encode one inbound message. Always yields a reply.
    pub async fn handle(&self, conn: &Connection, message: Message) -> Message {
        let started = Instant::now();

        let mut call = match decode(message) {
            Ok(call) => call,
            Err(err) => {
                tracing::debug!(code = %err.code(), detail = err.detail(), "rejected before execution");
                let record = err.to_record();
                self.metrics.observe_decode_error(&record);
                return Message::Record(record);
            }
        };
        let label = call.label();
        let ops = call.op_names();

        let executed = match &self.logic {
            Some(logic) => {
                let conn = conn.clone();
                logic
                    .run(move || {
                        let ran = call.run(&mut *conn.lock());
                        (call, ran)
                    })
                    .await
            }
            None => {
                let ran = call.run(&mut *conn.lock());
                Ok((call, ran))
            }
        };

        let reply = match executed {
            Ok((call, Ok(()))) => call.into_wire(),
            Ok((_, Err(err))) | Err(err) => {
                tracing::error!(op = label, code = %err.code(), detail = err.detail(), "dispatch failed");
                Message::Record(err.to_record())
            }
        };

        self.metrics
            .observe_reply(label, &ops, &reply, started.elapsed());
        reply
    }
}

/// Decode an inbound message into a deferred call.
pub fn decode(message: Message) -> RpcResult<DeferredCall> {
    match message {
        Message::Record(record) => {
            let request = Request::from_record(&record)?;
            Ok(DeferredCall::Single(SingleCall::new(request)))
        }
        Message::Array(array) if array.is(BATCH) => {
            let calls = array
                .into_items()
                .into_iter()
                .map(decode_batch_item)
                .collect::<RpcResult<Vec<_>>>()?;
            Ok(DeferredCall::Batch(BatchCall::new(calls)))
        }
        Message::Array(array) => Err(RpcError::unknown_message(array.name())),
    }
}

fn decode_batch_item(item: Value) -> RpcResult<SingleCall> {
    match item {
        // A nested record named BATCH is not in the operation table either.
        Value::Record(record) => Request::from_record(&record).map(SingleCall::new),
        Value::Array(array) => Err(RpcError::unknown_message(array.name())),
        other => Err(RpcError::format(format!(
            "batch item must be a request record, got {}",
            other.kind()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use orbit_core::types::FleetStatus;
    use orbit_core::{Array, ErrorCode, Record, Reply};

    use super::*;
    use crate::environment::SharedEnvironment;
    use crate::test_support::{record, registry, running_with_journal, Attaches, Journal, PROTOCOL};

    fn dispatcher(env: Arc<dyn Environment>, logic: bool) -> Dispatcher {
        let logic = logic.then(|| LogicThread::spawn("orbit-logic-test").unwrap());
        Dispatcher::new(registry(), env, PROTOCOL, logic, Arc::default())
    }

    fn login(user: &str, passphrase: &str) -> Value {
        Value::Record(
            Record::new("LOGIN")
                .with("user", Value::Str(user.into()))
                .with("passphrase", Value::Str(passphrase.into()))
                .with("protocol_version", Value::Str(PROTOCOL.into())),
        )
    }

    fn op(name: &str) -> Value {
        Value::Record(Record::new(name))
    }

    fn move_fleet(fleet: i64) -> Value {
        Value::Record(
            Record::new("MOVE_FLEET")
                .with("fleet", Value::Int(fleet))
                .with("x", Value::Int(10))
                .with("y", Value::Int(20)),
        )
    }

    fn batch(items: Vec<Value>) -> Message {
        Message::Array(Array::from_items(BATCH, items))
    }

    fn items(reply: Message) -> Vec<Value> {
        match reply {
            Message::Array(array) => {
                assert!(array.is("BATCH_RESPONSE"));
                array.into_items()
            }
            Message::Record(record) => panic!("expected batch response, got {}", record.name()),
        }
    }

    #[tokio::test]
    async fn single_request_round_trip() {
        let d = dispatcher(Arc::new(SharedEnvironment::idle()), true);
        let conn = d.connect();

        let reply = d.handle(&conn, Message::Record(Record::new("PING"))).await;
        assert!(record(&reply).is("PONG"));

        let reply = d.handle(&conn, Message::Record(Record::new("GET_TURN"))).await;
        assert_eq!(RpcError::from_record(record(&reply)).code(), ErrorCode::NotLoggedIn);
    }

    #[tokio::test]
    async fn batch_short_circuits_at_the_first_failure() {
        let journal = Journal::default();
        let env = running_with_journal(&Attaches::default(), &journal);
        let d = dispatcher(env, true);
        let conn = d.connect();

        let reply = d
            .handle(
                &conn,
                batch(vec![
                    login("alice", "hunter2"),
                    op("END_TURN"),
                    move_fleet(-1),
                    op("END_TURN"),
                    op("GET_TURN"),
                ]),
            )
            .await;
        let items = items(reply);

        // k = 3: two successes, then the failure; the tail never ran.
        assert_eq!(items.len(), 3);
        assert_eq!(*journal.lock().unwrap(), vec!["END_TURN", "MOVE_FLEET"]);
        let Value::Record(last) = &items[2] else { panic!("expected record") };
        assert_eq!(RpcError::from_record(last), RpcError::game("no such fleet: -1"));
    }

    #[tokio::test]
    async fn batch_results_decode_in_order() {
        let env = running_with_journal(&Attaches::default(), &Journal::default());
        let d = dispatcher(env, false);
        let conn = d.connect();

        let new_fleet = Value::Record(
            Record::new("NEW_FLEET")
                .with("planet", Value::Str("Earth".into()))
                .with("ships", Value::Array(Array::new("int"))),
        );
        let items = items(
            d.handle(&conn, batch(vec![login("bob", "swordfish"), new_fleet, move_fleet(101)]))
                .await,
        );
        assert_eq!(items.len(), 3);

        let fleet = items[1].clone().into_message().unwrap();
        let fleet = FleetStatus::from_reply(fleet, "FLEET").unwrap();
        assert_eq!(fleet.id, 101);
        assert_eq!(fleet.owner, "bob");
        let ack = items[2].clone().into_message().unwrap();
        assert!(<()>::from_reply(ack, "OK").is_ok());
        assert_eq!(conn.participant().as_deref(), Some("bob"));
    }

    #[tokio::test]
    async fn nested_batches_are_unknown_messages() {
        let d = dispatcher(Arc::new(SharedEnvironment::idle()), true);
        let conn = d.connect();

        let nested = Value::Array(Array::from_items(BATCH, vec![op("PING")]));
        let reply = d.handle(&conn, batch(vec![op("PING"), nested])).await;
        let err = RpcError::from_record(record(&reply));
        assert_eq!(err.code(), ErrorCode::UnknownMessage);
        assert_eq!(err.detail(), "BATCH");

        let reply = d.handle(&conn, batch(vec![op("PING"), op("BATCH")])).await;
        assert_eq!(RpcError::from_record(record(&reply)).code(), ErrorCode::UnknownMessage);
    }

    #[tokio::test]
    async fn decode_failures_reject_the_whole_batch() {
        let journal = Journal::default();
        let d = dispatcher(running_with_journal(&Attaches::default(), &journal), true);
        let conn = d.connect();

        let bad = Value::Record(Record::new("MOVE_FLEET").with("fleet", Value::Int(1)));
        let reply = d
            .handle(&conn, batch(vec![login("alice", "hunter2"), op("END_TURN"), bad]))
            .await;
        assert_eq!(RpcError::from_record(record(&reply)).code(), ErrorCode::Format);
        assert!(journal.lock().unwrap().is_empty());
        assert_eq!(conn.participant(), None);

        let reply = d.handle(&conn, batch(vec![Value::Int(3)])).await;
        assert_eq!(RpcError::from_record(record(&reply)).code(), ErrorCode::Format);

        let reply = d
            .handle(&conn, Message::Array(Array::from_items("FLEETS", vec![])))
            .await;
        let err = RpcError::from_record(record(&reply));
        assert_eq!(err.code(), ErrorCode::UnknownMessage);
        assert_eq!(err.detail(), "FLEETS");
    }

    #[tokio::test]
    async fn engine_panics_become_server_bug() {
        let d = dispatcher(running_with_journal(&Attaches::default(), &Journal::default()), true);
        let conn = d.connect();

        let reply = d.handle(&conn, batch(vec![login("alice", "hunter2"), op("SURRENDER"), op("GET_TURN")])).await;
        let items = items(reply);
        assert_eq!(items.len(), 2);
        let Value::Record(err) = &items[1] else { panic!("expected record") };
        let err = RpcError::from_record(err);
        assert_eq!(err.code(), ErrorCode::ServerBug);
        assert_eq!(err.cause(), Some("engine exploded"));

        // The logic thread survived and the session is intact.
        let reply = d.handle(&conn, Message::Record(Record::new("GET_TURN"))).await;
        assert_eq!(i64::from_reply(reply, "TURN").unwrap(), 1);
        assert_eq!(d.metrics().errors.get(&[("code", "SERVER_BUG")]), 1);
    }

    #[tokio::test]
    async fn sessions_are_per_connection() {
        let attaches = Attaches::default();
        let d = dispatcher(running_with_journal(&attaches, &Journal::default()), true);
        let first = d.connect();
        let second = d.connect();

        d.handle(&first, batch(vec![login("alice", "hunter2"), op("END_TURN")])).await;
        let reply = d.handle(&second, Message::Record(Record::new("GET_TURN"))).await;
        assert_eq!(RpcError::from_record(record(&reply)).code(), ErrorCode::NotLoggedIn);

        d.handle(&second, batch(vec![login("bob", "swordfish")])).await;
        let reply = d.handle(&second, Message::Record(Record::new("GET_TURN"))).await;
        assert_eq!(i64::from_reply(reply, "TURN").unwrap(), 1);
        assert_eq!(attaches.load(Ordering::SeqCst), 2);
    }
}
