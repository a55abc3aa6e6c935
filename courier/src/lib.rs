pub mod api;
pub mod types;

use std::{mem, sync::Arc, time::Duration};

use ahash::{HashMap, HashMapExt};
use mortar::{Future, FutureError, Outcome, Results};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, trace, warn};

pub use api::Api;
pub use types::*;
use types::ItemHooks;

#[derive(Debug, Error)]
pub enum CourierError {
    #[error("no request in flight with id {0}")]
    UnknownRequest(RequestId),
    #[error("a batch needs at least one request")]
    EmptyBatch,
    #[error("batch item {index} has no path")]
    MissingPath { index: usize },
    #[error(transparent)]
    Future(#[from] FutureError),
}

// ============================================================================
// Client
// ============================================================================

struct InFlight {
    future: Future<Message>,
    timeout: Duration,
}

/// Hands out one [`Future`] per request and settles it when the host reports
/// back.
///
/// The client does no I/O. Requests queue up in an outbox; the host drains it
/// with [`take_outbox`](Self::take_outbox), performs the calls, and answers
/// each one with [`deliver`](Self::deliver) or [`expire`](Self::expire).
pub struct Client {
    in_flight: HashMap<RequestId, InFlight>,
    outbox: Vec<Outbound>,
    next_id: u64,
}

impl Client {
    pub fn new() -> Self {
        Self {
            in_flight: HashMap::new(),
            outbox: Vec::new(),
            next_id: 1,
        }
    }

    /// Queues `request` and returns the future it will settle.
    ///
    /// The future succeeds iff the response status is 2xx, and settles with
    /// `[Message::Response, Message::Request]`.
    pub fn send(&mut self, request: Request) -> Future<Message> {
        self.enqueue(request).1
    }

    fn enqueue(&mut self, request: Request) -> (RequestId, Future<Message>) {
        let id = RequestId(self.next_id);
        self.next_id += 1;

        let future = Future::new(1);
        debug!(%id, method = %request.method, url = %request.url, "request queued");
        self.in_flight.insert(
            id,
            InFlight {
                future: future.clone(),
                timeout: request.timeout,
            },
        );
        self.outbox.push(Outbound { id, request });
        (id, future)
    }

    /// Requests queued since the last call, in send order.
    pub fn take_outbox(&mut self) -> Vec<Outbound> {
        mem::take(&mut self.outbox)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_in_flight(&self, id: RequestId) -> bool {
        self.in_flight.contains_key(&id)
    }

    /// Settles request `id` with the response the transport observed.
    pub fn deliver(&mut self, id: RequestId, response: Response) -> Result<Outcome, CourierError> {
        let in_flight = self
            .in_flight
            .remove(&id)
            .ok_or(CourierError::UnknownRequest(id))?;
        let success = response.is_ok();
        trace!(%id, status = response.status, "response delivered");
        in_flight.future.complete(
            success,
            vec![Message::Response(response), Message::Request(id)],
        )?;
        Ok(Outcome::from_success(success))
    }

    /// Fails request `id` because its deadline passed.
    pub fn expire(&mut self, id: RequestId) -> Result<(), CourierError> {
        let in_flight = self
            .in_flight
            .remove(&id)
            .ok_or(CourierError::UnknownRequest(id))?;
        debug!(%id, timeout = ?in_flight.timeout, "request timed out");
        in_flight.future.complete(
            false,
            vec![
                Message::Response(Response::timed_out(in_flight.timeout)),
                Message::Request(id),
            ],
        )?;
        Ok(())
    }

    /// Sends every request at once and returns one future tracking all of them.
    ///
    /// Each request reports into the batch as it settles, in whatever order the
    /// host delivers. Callbacks attached by the caller still see one
    /// `[Message::Exchange]` tuple per request in **request order**, since the
    /// first callback on the batch rebuilds the result from slots keyed by index.
    /// The batch outcome is that of the request delivered last.
    ///
    /// Items are plain [`Request`]s or [`BatchItem`]s carrying per-request hooks.
    /// A request's hooks fire when it settles, before it counts toward the
    /// batch, so they run ahead of any callback on the batch itself.
    pub fn batch<I>(&mut self, items: I) -> Result<Future<Message>, CourierError>
    where
        I: IntoIterator,
        I::Item: Into<BatchItem>,
    {
        let items: Vec<BatchItem> = items.into_iter().map(Into::into).collect();
        if items.is_empty() {
            return Err(CourierError::EmptyBatch);
        }

        let total = items.len();
        let batch = Future::new(total);
        let slots: Arc<Mutex<Vec<Option<Exchange>>>> = Arc::new(Mutex::new(vec![None; total]));

        let ordered = Arc::clone(&slots);
        batch.always(move |_, _| {
            if total == 1 {
                return None;
            }
            let entries = ordered
                .lock()
                .iter()
                .flatten()
                .map(|exchange| Results::Single(vec![Message::Exchange(exchange.clone())]))
                .collect();
            Some(Results::Batch(entries))
        })?;

        for (index, BatchItem { request, hooks }) in items.into_iter().enumerate() {
            let (id, future) = self.enqueue(request);

            let hooks = Arc::new(Mutex::new(hooks));
            let ok = Report {
                batch: batch.clone(),
                slots: Arc::clone(&slots),
                hooks: Arc::clone(&hooks),
                index,
                request: id,
            };
            let err = Report {
                batch: batch.clone(),
                slots: Arc::clone(&slots),
                hooks,
                index,
                request: id,
            };
            future
                .then(move |_, results| {
                    ok.run(true, results);
                    None
                })?
                .error(move |_, results| {
                    err.run(false, results);
                    None
                })?;
        }

        debug!(requests = total, "batch queued");
        Ok(batch)
    }

    /// Sends `request` if `validate` accepts it.
    ///
    /// A rejected submission never reaches the outbox: it comes back as an
    /// already-failed future carrying `[Message::Invalid(errors)]`.
    pub fn submit<V>(&mut self, request: Request, validate: V) -> Future<Message>
    where
        V: FnOnce(&Request) -> Result<(), Vec<String>>,
    {
        match validate(&request) {
            Ok(()) => self.send(request),
            Err(errors) => {
                debug!(url = %request.url, errors = errors.len(), "submission rejected");
                Future::ready(false, vec![Message::Invalid(errors)])
            }
        }
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

/// Feeds one settled request of a batch into the batch future.
struct Report {
    batch: Future<Message>,
    slots: Arc<Mutex<Vec<Option<Exchange>>>>,
    hooks: Arc<Mutex<ItemHooks>>,
    index: usize,
    request: RequestId,
}

impl Report {
    fn run(self, success: bool, results: &Results<Message>) {
        let Report {
            batch,
            slots,
            hooks,
            index,
            request,
        } = self;

        let exchange = Exchange {
            index,
            request,
            success,
            response: results
                .values()
                .into_iter()
                .find_map(Message::as_response)
                .cloned(),
        };
        let snapshot = {
            let mut slots = slots.lock();
            slots[index] = Some(exchange.clone());
            slots.clone()
        };

        let fire = hooks.lock().take(success);
        for hook in fire.into_iter().flatten() {
            hook(&exchange, &snapshot);
        }

        if let Err(err) = batch.complete(success, vec![Message::Exchange(exchange)]) {
            warn!(index, %request, %err, "batch refused a completion");
        }
    }
}
