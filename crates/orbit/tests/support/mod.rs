//! An in-process server with a small fleet engine behind it.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use orbit::core::types::{FleetStance, FleetStatus, Position};
use orbit::core::{Caller, GameplayRequest, Reply, Request, RpcError, RpcResult};
use orbit::gateway::dispatch::{Dispatcher, LogicThread};
use orbit::gateway::environment::{GameHandle, SharedEnvironment};
use orbit::gateway::session::SessionRegistry;
use orbit::gateway::transport::LoopbackTransport;

pub const VERSION: &str = "2.1";

/// Counters observed from inside the engine.
#[derive(Default)]
pub struct Stats {
    inside: AtomicUsize,
    overlaps: AtomicUsize,
    executed: AtomicUsize,
}

impl Stats {
    pub fn executed(&self) -> usize {
        self.executed.load(Ordering::SeqCst)
    }

    /// Times two engine calls were inside the engine at once.
    pub fn overlaps(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }
}

pub struct FleetEngine {
    owner: String,
    turn: i64,
    fleets: HashSet<i64>,
    next_fleet: i64,
    stats: Arc<Stats>,
}

impl FleetEngine {
    fn apply(&mut self, request: GameplayRequest, name: &str) -> RpcResult<orbit::core::Message> {
        match request {
            GameplayRequest::GetTurn {} => Ok(self.turn.into_reply(name)),
            GameplayRequest::EndTurn {} => {
                // Long enough for an unserialized caller to land inside.
                thread::sleep(Duration::from_millis(2));
                self.turn += 1;
                Ok(().into_reply(name))
            }
            GameplayRequest::NewFleet { planet, ships } => {
                self.next_fleet += 1;
                self.fleets.insert(self.next_fleet);
                Ok(FleetStatus {
                    id: self.next_fleet,
                    owner: self.owner.clone(),
                    name: format!("{planet} Guard"),
                    position: Position { x: 0, y: 0 },
                    ships,
                    stance: FleetStance::Defensive,
                    moving: false,
                }
                .into_reply(name))
            }
            GameplayRequest::MoveFleet { fleet, .. } if self.fleets.contains(&fleet) => {
                Ok(().into_reply(name))
            }
            GameplayRequest::MoveFleet { fleet, .. } => {
                Err(RpcError::game(format!("no such fleet: {fleet}")))
            }
            other => Err(RpcError::game(format!(
                "unsupported: {}",
                other.op().request_name()
            ))),
        }
    }
}

impl Caller for FleetEngine {
    fn call<R: Reply>(&mut self, request: Request) -> RpcResult<R> {
        let name = request.op().response_name();
        let Request::Gameplay(request) = request else {
            return Err(RpcError::game("control operation reached the engine"));
        };

        if self.stats.inside.fetch_add(1, Ordering::SeqCst) > 0 {
            self.stats.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        self.stats.executed.fetch_add(1, Ordering::SeqCst);
        let reply = self.apply(request, name);
        self.stats.inside.fetch_sub(1, Ordering::SeqCst);

        R::from_reply(reply?, name)
    }
}

pub struct Server {
    pub runtime: tokio::runtime::Runtime,
    pub dispatcher: Arc<Dispatcher>,
    pub stats: Arc<Stats>,
}

impl Server {
    /// A running game, served through a logic thread.
    pub fn start() -> Self {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .enable_all()
            .build()
            .unwrap();

        let stats = Arc::new(Stats::default());
        let engine_stats = Arc::clone(&stats);
        let environment = SharedEnvironment::running(Arc::new(move |participant: &str| -> RpcResult<GameHandle> {
            Ok(Box::new(FleetEngine {
                owner: participant.to_string(),
                turn: 1,
                fleets: HashSet::new(),
                next_fleet: 100,
                stats: Arc::clone(&engine_stats),
            }))
        }));

        let registry = SessionRegistry::new([("alice", "hunter2"), ("bob", "swordfish")]);
        let dispatcher = Dispatcher::new(
            Arc::new(registry),
            Arc::new(environment),
            VERSION,
            Some(LogicThread::spawn("orbit-logic-test").unwrap()),
            Arc::default(),
        );

        Self {
            runtime,
            dispatcher: Arc::new(dispatcher),
            stats,
        }
    }

    /// A new connection.
    pub fn connect(&self) -> LoopbackTransport {
        LoopbackTransport::new(Arc::clone(&self.dispatcher), self.runtime.handle().clone())
    }
}
