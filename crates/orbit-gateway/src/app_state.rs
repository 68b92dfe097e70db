//! Shared application state for the orbit gateway.
//!
//! Startup errors are returned, not panicked on.

use std::sync::Arc;

use crate::config::RpcConfig;
use crate::dispatch::{Dispatcher, LogicThread};
use crate::environment::SharedEnvironment;
use crate::obs::RpcMetrics;
use crate::session::SessionRegistry;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: RpcConfig,
    environment: Arc<SharedEnvironment>,
    dispatcher: Arc<Dispatcher>,
    metrics: Arc<RpcMetrics>,
}

impl AppState {
    pub fn new(cfg: RpcConfig, environment: Arc<SharedEnvironment>) -> std::io::Result<Self> {
        let registry = Arc::new(SessionRegistry::from_config(&cfg.participants));
        let metrics = Arc::new(RpcMetrics::default());

        let logic = if cfg.server.logic_thread {
            Some(LogicThread::spawn("orbit-logic")?)
        } else {
            tracing::warn!("logic thread disabled; gameplay runs on network tasks");
            None
        };

        let dispatcher = Dispatcher::new(
            registry,
            environment.clone(),
            cfg.server.protocol_version.clone(),
            logic,
            Arc::clone(&metrics),
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                environment,
                dispatcher: Arc::new(dispatcher),
                metrics,
            }),
        })
    }

    pub fn cfg(&self) -> &RpcConfig {
        &self.inner.cfg
    }

    pub fn environment(&self) -> Arc<SharedEnvironment> {
        Arc::clone(&self.inner.environment)
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.inner.dispatcher)
    }

    pub fn metrics(&self) -> Arc<RpcMetrics> {
        Arc::clone(&self.inner.metrics)
    }
}
