//! Client bindings against an in-process gateway.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::mpsc;
use std::sync::Arc;

use orbit_client::{AsyncClient, LocalAdapter, SyncClient, TokioScheduler};
use orbit_core::types::Welcome;
use orbit_core::{AsyncControl, Control, ErrorCode, Gameplay, RpcResult};
use orbit_gateway::dispatch::Dispatcher;
use orbit_gateway::environment::SharedEnvironment;
use orbit_gateway::session::{SessionAdapter, SessionRegistry, TOKEN_LEN};
use orbit_gateway::transport::LoopbackTransport;

const VERSION: &str = "3";

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
}

fn registry() -> Arc<SessionRegistry> {
    Arc::new(SessionRegistry::new([("alice", "hunter2")]))
}

fn dispatcher() -> Arc<Dispatcher> {
    Arc::new(Dispatcher::new(
        registry(),
        Arc::new(SharedEnvironment::loading()),
        VERSION,
        None,
        Arc::default(),
    ))
}

#[test]
fn sync_client_login_and_guard() {
    let rt = runtime();
    let mut client = SyncClient::new(LoopbackTransport::new(dispatcher(), rt.handle().clone()));

    client.ping().unwrap();
    assert_eq!(client.get_turn().unwrap_err().code(), ErrorCode::NotLoggedIn);

    let err = client
        .login("alice".into(), "hunter2".into(), "2".into())
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Version);

    let welcome = client
        .login("alice".into(), "hunter2".into(), VERSION.into())
        .unwrap();
    assert_eq!(welcome.session_id.len(), TOKEN_LEN);

    // Logged in, but the environment is still loading.
    assert_eq!(client.get_turn().unwrap_err().code(), ErrorCode::NotReady);
    assert_eq!(client.transport().exchanges(), 5);
}

#[test]
fn sync_client_reports_a_dead_link_as_transport() {
    let rt = runtime();
    let transport = LoopbackTransport::new(dispatcher(), rt.handle().clone());
    transport.disconnect();
    let mut client = SyncClient::new(transport);
    assert_eq!(client.ping().unwrap_err().code(), ErrorCode::Transport);
}

#[test]
fn async_client_delivers_on_the_runtime() {
    let rt = runtime();
    let transport = LoopbackTransport::new(dispatcher(), rt.handle().clone());
    let mut client = AsyncClient::new(transport, Arc::new(TokioScheduler::new(rt.handle().clone())));

    let (tx, rx) = mpsc::channel::<RpcResult<()>>();
    client.ping(Box::new(move |r| tx.send(r).unwrap()));
    rx.recv().unwrap().unwrap();
}

#[test]
fn local_adapter_over_a_session() {
    let session = SessionAdapter::new(registry(), Arc::new(SharedEnvironment::idle()), VERSION);
    let mut local = LocalAdapter::new(session);
    let (tx, rx) = mpsc::channel::<String>();

    local.begin().unwrap();
    let t = tx.clone();
    local.login(
        "alice".into(),
        "hunter2".into(),
        VERSION.into(),
        Box::new(move |r: RpcResult<Welcome>| t.send(format!("login {}", r.is_ok())).unwrap()),
    );
    let t = tx.clone();
    orbit_core::AsyncGameplay::get_turn(
        &mut local,
        Box::new(move |r: RpcResult<i64>| t.send(format!("turn {}", r.unwrap_err().code())).unwrap()),
    );
    local.end().unwrap();
    drop(tx);

    let seen: Vec<String> = rx.iter().collect();
    assert_eq!(seen, vec!["login true", "turn NO_GAME_RUNNING"]);
    assert_eq!(local.target().participant(), Some("alice"));
}
