//! Shared fixtures for the gateway's unit tests.

#![allow(clippy::unwrap_used)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use orbit_core::types::{FleetStance, FleetStatus, Position};
use orbit_core::{
    Array, Caller, GameplayRequest, Message, OpId, Record, Reply, Request, RpcError, RpcResult,
    Value,
};

use crate::environment::{GameHandle, SharedEnvironment};
use crate::session::registry::SessionGame;
use crate::session::SessionRegistry;

pub const PROTOCOL: &str = "1.4";

pub type Attaches = Arc<AtomicUsize>;

/// Names of gameplay operations the engines actually executed.
pub type Journal = Arc<Mutex<Vec<&'static str>>>;

pub fn registry() -> Arc<SessionRegistry> {
    Arc::new(SessionRegistry::new([
        ("alice", "hunter2"),
        ("bob", "swordfish"),
    ]))
}

pub fn running(attaches: &Attaches) -> Arc<SharedEnvironment> {
    running_with_journal(attaches, &Journal::default())
}

pub fn running_with_journal(attaches: &Attaches, journal: &Journal) -> Arc<SharedEnvironment> {
    let attaches = attaches.clone();
    let journal = journal.clone();
    Arc::new(SharedEnvironment::running(Arc::new(move |participant: &str| -> RpcResult<GameHandle> {
        attaches.fetch_add(1, Ordering::SeqCst);
        Ok(engine(participant, &journal))
    })))
}

/// A fresh engine at turn 1.
pub fn engine(owner: &str, journal: &Journal) -> GameHandle {
    Box::new(TestEngine {
        owner: owner.to_string(),
        turn: 1,
        next_fleet: 100,
        journal: journal.clone(),
    })
}

/// A standalone engine at turn 1, wrapped as a session handle.
pub fn shared_engine() -> SessionGame {
    Arc::new(Mutex::new(engine("alice", &Journal::default())))
}

/// A tiny engine answering a handful of operations.
pub struct TestEngine {
    owner: String,
    turn: i64,
    next_fleet: i64,
    journal: Journal,
}

impl Caller for TestEngine {
    fn call<R: Reply>(&mut self, request: Request) -> RpcResult<R> {
        let op = request.op();
        let name = op.response_name();
        let Request::Gameplay(request) = request else {
            return Err(RpcError::game("engine does not handle control operations"));
        };
        self.journal.lock().unwrap().push(op.request_name());

        let reply = match request {
            GameplayRequest::GetTurn {} => self.turn.into_reply(name),
            GameplayRequest::EndTurn {} => {
                self.turn += 1;
                ().into_reply(name)
            }
            GameplayRequest::GetCredits {} => 1000i64.into_reply(name),
            GameplayRequest::NewFleet { ships, .. } => {
                self.next_fleet += 1;
                FleetStatus {
                    id: self.next_fleet,
                    owner: self.owner.clone(),
                    name: format!("Fleet {}", self.next_fleet),
                    position: Position { x: 0, y: 0 },
                    ships,
                    stance: FleetStance::Defensive,
                    moving: false,
                }
                .into_reply(name)
            }
            GameplayRequest::MoveFleet { fleet, .. } if fleet < 0 => {
                return Err(RpcError::game(format!("no such fleet: {fleet}")));
            }
            GameplayRequest::MoveFleet { .. } => ().into_reply(name),
            GameplayRequest::Surrender {} => panic!("engine exploded"),
            other => return Err(RpcError::game(format!("unsupported: {}", other.op().request_name()))),
        };
        R::from_reply(reply, name)
    }
}

/// A decodable request for any operation, with placeholder arguments.
pub fn sample_request(op: OpId) -> Request {
    let stance = if op == OpId::SetUnitStance { "HOLD" } else { "PASSIVE" };
    let s = |v: &str| Value::Str(v.to_string());
    let record = Record::new(op.request_name())
        .with("user", s("alice"))
        .with("passphrase", s("hunter2"))
        .with("protocol_version", s(PROTOCOL))
        .with("session", s("00"))
        .with("name", s("Alpha"))
        .with("to", s("bob"))
        .with("text", s("hello"))
        .with("planet", s("Earth"))
        .with("ships", Value::Array(Array::new("int")))
        .with("waypoints", Value::Array(Array::new("string")))
        .with("fleet", Value::Int(1))
        .with("other", Value::Int(2))
        .with("x", Value::Int(10))
        .with("y", Value::Int(20))
        .with("stance", s(stance))
        .with("ship", Value::Int(1))
        .with("module", s("shield"))
        .with("rate", Value::Int(10))
        .with("kind", s("mine"))
        .with("building", Value::Int(1))
        .with("item", s("frigate"))
        .with("quantity", Value::Int(1))
        .with("order", Value::Int(1))
        .with("priority", s("HIGH"))
        .with("position", Value::Int(0))
        .with("topic", s("lasers"))
        .with("percent", Value::Int(30))
        .with("battle", Value::Int(1))
        .with("unit", Value::Int(1))
        .with("target", Value::Int(2))
        .with("formation", s("WEDGE"))
        .with("ability", s("cloak"));
    Request::from_record(&record).unwrap()
}

pub fn record(message: &Message) -> &Record {
    match message {
        Message::Record(record) => record,
        Message::Array(array) => panic!("expected record, got array {}", array.name()),
    }
}
