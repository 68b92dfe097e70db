//! The single logic thread.
//!
//! All game-state mutation is serialized through one named OS thread that
//! drains a job channel. Network tasks hand a closure over and await its
//! result on a oneshot; they never touch game state themselves.

use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use tokio::sync::{mpsc, oneshot};

use orbit_core::{RpcError, RpcResult};

type Job = Box<dyn FnOnce() + Send + 'static>;

pub struct LogicThread {
    tx: Option<mpsc::UnboundedSender<Job>>,
    handle: Option<JoinHandle<()>>,
}

impl LogicThread {
    pub fn spawn(name: &str) -> std::io::Result<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                while let Some(job) = rx.blocking_recv() {
                    if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                        tracing::error!("logic job panicked; thread continues");
                    }
                }
                tracing::debug!("logic thread drained");
            })?;
        tracing::info!(thread = name, "logic thread started");

        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
        })
    }

    /// Run `f` on the logic thread and await its result.
    ///
    /// A job that never replies (the thread stopped, or the job panicked) is
    /// reported as INTERRUPTED.
    pub async fn run<T, F>(&self, f: F) -> RpcResult<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move || {
            let _ = reply_tx.send(f());
        });

        self.tx
            .as_ref()
            .ok_or_else(|| RpcError::interrupted("logic thread stopped"))?
            .send(job)
            .map_err(|_| RpcError::interrupted("logic thread stopped"))?;

        reply_rx
            .await
            .map_err(|_| RpcError::interrupted("logic job ended without a result"))
    }
}

impl Drop for LogicThread {
    fn drop(&mut self) {
        // Closing the channel lets the thread finish queued jobs and exit.
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    use orbit_core::ErrorCode;

    use super::*;

    #[tokio::test]
    async fn jobs_run_on_the_named_thread() {
        let logic = LogicThread::spawn("orbit-logic-test").unwrap();
        let name = logic
            .run(|| thread::current().name().map(str::to_string))
            .await
            .unwrap();
        assert_eq!(name.as_deref(), Some("orbit-logic-test"));
    }

    #[tokio::test]
    async fn panicking_job_is_interrupted_and_thread_survives() {
        let logic = LogicThread::spawn("orbit-logic-test").unwrap();
        let err = logic
            .run(|| -> u32 { panic!("job failed") })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Interrupted);
        assert_eq!(logic.run(|| 7).await.unwrap(), 7);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn jobs_never_overlap() {
        let logic = Arc::new(LogicThread::spawn("orbit-logic-test").unwrap());
        let busy = Arc::new(AtomicBool::new(false));
        let overlaps = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let (logic, busy, overlaps) = (logic.clone(), busy.clone(), overlaps.clone());
            tasks.push(tokio::spawn(async move {
                logic
                    .run(move || {
                        if busy.swap(true, Ordering::SeqCst) {
                            overlaps.fetch_add(1, Ordering::SeqCst);
                        }
                        thread::sleep(std::time::Duration::from_millis(2));
                        busy.store(false, Ordering::SeqCst);
                    })
                    .await
                    .unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    }
}
