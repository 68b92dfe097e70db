//! Operational HTTP endpoints.
//!
//! - `/healthz` : liveness
//! - `/readyz`  : readiness (503 while the environment is loading)
//! - `/metrics` : Prometheus text format

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::app_state::AppState;
use crate::environment::{Environment, EnvironmentStatus};

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    match state.environment().status() {
        EnvironmentStatus::Loading => (StatusCode::SERVICE_UNAVAILABLE, "loading"),
        EnvironmentStatus::Idle => (StatusCode::OK, "idle"),
        EnvironmentStatus::Running => (StatusCode::OK, "running"),
    }
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    let mut body = state.metrics().render();
    body.push_str(&format!(
        "# TYPE orbit_sessions_bound gauge\norbit_sessions_bound {}\n",
        state.dispatcher().registry().bound_count()
    ));

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
        .into_response()
}
