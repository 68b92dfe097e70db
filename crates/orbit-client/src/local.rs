//! Callback contract over an in-process blocking implementation.
//!
//! No network and no wire batching. Outside a batch each call runs at once
//! and its callback fires before the call returns. Inside a batch calls are
//! queued as deferred actions and `end` runs every one of them in order,
//! each delivering to its own callback, then runs the completion callback.
//! A failing action does not stop the ones queued after it.

use orbit_core::{AsyncCaller, BatchError, Callback, Control, Gameplay, Reply, Request};

type Action<G> = Box<dyn FnOnce(&mut G) + Send>;

pub struct LocalAdapter<G> {
    target: G,
    queue: Option<Vec<Action<G>>>,
}

impl<G: Control + Gameplay> LocalAdapter<G> {
    pub fn new(target: G) -> Self {
        Self {
            target,
            queue: None,
        }
    }

    pub fn target(&self) -> &G {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut G {
        &mut self.target
    }

    pub fn into_inner(self) -> G {
        self.target
    }

    pub fn is_batching(&self) -> bool {
        self.queue.is_some()
    }

    pub fn begin(&mut self) -> Result<(), BatchError> {
        if self.queue.is_some() {
            return Err(BatchError::AlreadyOpen);
        }
        self.queue = Some(Vec::new());
        Ok(())
    }

    pub fn end(&mut self) -> Result<(), BatchError> {
        self.run_queue()
    }

    pub fn end_with<F: FnOnce()>(&mut self, on_complete: F) -> Result<(), BatchError> {
        self.run_queue()?;
        on_complete();
        Ok(())
    }

    fn run_queue(&mut self) -> Result<(), BatchError> {
        let queue = self.queue.take().ok_or(BatchError::NotOpen)?;
        for action in queue {
            action(&mut self.target);
        }
        Ok(())
    }
}

impl<G: Control + Gameplay + 'static> AsyncCaller for LocalAdapter<G> {
    fn call_async<R: Reply + Send + 'static>(&mut self, request: Request, callback: Callback<R>) {
        let action = move |target: &mut G| {
            let name = request.op().response_name();
            let result = request
                .execute(target)
                .and_then(|reply| R::from_reply(reply, name));
            callback(result);
        };

        match &mut self.queue {
            Some(queue) => queue.push(Box::new(action)),
            None => action(&mut self.target),
        }
    }
}
