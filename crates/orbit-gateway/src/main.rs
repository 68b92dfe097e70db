//! orbit gateway binary.
//!
//! - Config from `ORBIT_CONFIG` (default `orbit.yaml`), strictly parsed
//! - WebSocket endpoint: /v1/rpc
//! - Starts with an idle environment; a game host plugs in through
//!   `SharedEnvironment::start`

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use orbit_gateway::{app_state::AppState, config, environment::SharedEnvironment, router};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let path = std::env::var("ORBIT_CONFIG").unwrap_or_else(|_| "orbit.yaml".to_string());
    let cfg = config::load_from_file(&path)?;
    let listen: SocketAddr = cfg.server.listen.parse()?;

    let environment = Arc::new(SharedEnvironment::idle());
    let state = AppState::new(cfg, environment)?;
    let app = router::build_router(state);

    tracing::info!(%listen, config = %path, "orbit-gateway starting");
    let listener = tokio::net::TcpListener::bind(listen).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
