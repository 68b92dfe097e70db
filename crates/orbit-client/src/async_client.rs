//! Callback client binding with request batching.
//!
//! Outside a batch every call is sent immediately and its callback fires
//! whenever the reply arrives; replies to independent calls may arrive in
//! any order. Between [`AsyncClient::begin`] and [`AsyncClient::end`] calls
//! are queued instead, then sent as one `BATCH` exchange whose results are
//! delivered to the queued callbacks in order.
//!
//! The server stops a batch at the first failing call. Positions it never
//! reached receive NOT_EXECUTED rather than staying silent. A reply that
//! rejects the batch as a whole (one `ERROR` record) and a transport failure
//! are delivered to every queued callback.

use std::sync::Arc;

use orbit_core::contract::{BATCH, BATCH_RESPONSE};
use orbit_core::error::ERROR_RECORD;
use orbit_core::wire::decode_response;
use orbit_core::{
    Array, AsyncCaller, AsyncTransport, BatchError, Callback, Message, Reply, Request, RpcError,
    RpcResult, Scheduler, Value,
};

type Deliver = Box<dyn FnOnce(RpcResult<Message>) + Send + 'static>;
type Completion = Box<dyn FnOnce() + Send + 'static>;

struct Pending {
    request: Request,
    deliver: Deliver,
}

pub struct AsyncClient<T> {
    transport: T,
    scheduler: Arc<dyn Scheduler>,
    batch: Option<Vec<Pending>>,
}

impl<T: AsyncTransport> AsyncClient<T> {
    pub fn new(transport: T, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            transport,
            scheduler,
            batch: None,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn is_batching(&self) -> bool {
        self.batch.is_some()
    }

    /// Start queueing calls.
    pub fn begin(&mut self) -> Result<(), BatchError> {
        if self.batch.is_some() {
            return Err(BatchError::AlreadyOpen);
        }
        self.batch = Some(Vec::new());
        Ok(())
    }

    /// Send the queued calls as one exchange.
    pub fn end(&mut self) -> Result<(), BatchError> {
        self.finish(None)
    }

    /// Like [`end`](Self::end); `on_complete` runs after every queued
    /// callback has been delivered.
    pub fn end_with<F>(&mut self, on_complete: F) -> Result<(), BatchError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.finish(Some(Box::new(on_complete)))
    }

    fn finish(&mut self, on_complete: Option<Completion>) -> Result<(), BatchError> {
        let queued = self.batch.take().ok_or(BatchError::NotOpen)?;

        if queued.is_empty() {
            if let Some(done) = on_complete {
                self.scheduler.schedule(done);
            }
            return Ok(());
        }

        let mut items = Vec::with_capacity(queued.len());
        let mut delivers = Vec::with_capacity(queued.len());
        for pending in queued {
            items.push(Value::Record(pending.request.to_record()));
            delivers.push(pending.deliver);
        }
        tracing::trace!(calls = items.len(), "sending batch");

        self.transport.query_async(
            Message::Array(Array::from_items(BATCH, items)),
            Arc::clone(&self.scheduler),
            Box::new(move |result| {
                deliver_batch(result, delivers);
                if let Some(done) = on_complete {
                    done();
                }
            }),
        );
        Ok(())
    }
}

impl<T: AsyncTransport> AsyncCaller for AsyncClient<T> {
    fn call_async<R: Reply + Send + 'static>(&mut self, request: Request, callback: Callback<R>) {
        let name = request.op().response_name();
        let deliver: Deliver = Box::new(move |result: RpcResult<Message>| {
            callback(result.and_then(|m| decode_response::<R>(m, name)))
        });

        match &mut self.batch {
            Some(queue) => queue.push(Pending { request, deliver }),
            None => self.transport.query_async(
                Message::Record(request.to_record()),
                Arc::clone(&self.scheduler),
                deliver,
            ),
        }
    }
}

fn deliver_batch(result: RpcResult<Message>, delivers: Vec<Deliver>) {
    let array = match result {
        Ok(Message::Array(array)) if array.is(BATCH_RESPONSE) => array,
        Ok(Message::Record(record)) if record.is(ERROR_RECORD) => {
            return deliver_all(delivers, RpcError::from_record(&record));
        }
        Ok(other) => {
            let err = RpcError::format(format!(
                "expected {BATCH_RESPONSE}, got {}",
                other.name()
            ));
            return deliver_all(delivers, err);
        }
        Err(err) => return deliver_all(delivers, err),
    };

    if array.len() > delivers.len() {
        tracing::warn!(
            sent = delivers.len(),
            received = array.len(),
            "batch response longer than the batch"
        );
    }

    let mut items = array.into_items().into_iter();
    for deliver in delivers {
        let result = match items.next() {
            Some(item) => item
                .into_message()
                .ok_or_else(|| RpcError::format("batch response item is not a message")),
            None => Err(RpcError::not_executed()),
        };
        deliver(result);
    }
}

fn deliver_all(delivers: Vec<Deliver>, err: RpcError) {
    for deliver in delivers {
        deliver(Err(err.clone()));
    }
}
