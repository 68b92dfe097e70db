//! Callback scheduling on a tokio runtime.

use tokio::runtime::Handle;

use orbit_core::Scheduler;

/// Delivers callbacks as tasks on a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Scheduler for the runtime the caller is running on, if any.
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, task: Box<dyn FnOnce() + Send + 'static>) {
        self.handle.spawn(async move { task() });
    }
}
