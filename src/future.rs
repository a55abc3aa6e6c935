use std::{
    collections::VecDeque,
    fmt, mem,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll, Waker},
    thread::{self, ThreadId},
};

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::{
    error::FutureError,
    results::{Kind, Outcome, Results},
};

type Callback<T, O> =
    Box<dyn FnOnce(&O, &Results<T>) -> Result<Option<Results<T>>, FutureError> + Send>;

struct State<T, O> {
    remaining: usize,
    last_success: bool,
    outcome: Option<Outcome>,
    /// Bumped on every settlement so a pass never writes into a later one.
    generation: u64,
    per_task: Vec<Results<T>>,
    current: Option<Arc<Results<T>>>,
    log: VecDeque<(Kind, Callback<T, O>)>,
    /// Thread currently draining the log, if any.
    dispatcher: Option<ThreadId>,
    waiters: Vec<Waker>,
}

impl<T: Clone, O> State<T, O> {
    /// Records one completion. Returns the waiters to wake if this settled the future.
    fn record(&mut self, success: bool, results: Results<T>) -> Option<Vec<Waker>> {
        self.per_task.push(results);
        self.remaining -= 1;
        // Last writer wins: an earlier failure is forgotten if a later task succeeds.
        self.last_success = success;
        trace!(remaining = self.remaining, success, "task completed");

        if self.remaining > 0 {
            return None;
        }

        let outcome = Outcome::from_success(self.last_success);
        let final_result = match self.per_task.as_slice() {
            [only] => only.clone(),
            all => Results::Batch(all.to_vec()),
        };
        self.outcome = Some(outcome);
        self.current = Some(Arc::new(final_result));
        self.generation += 1;
        debug!(%outcome, tasks = self.per_task.len(), queued = self.log.len(), "future settled");
        Some(mem::take(&mut self.waiters))
    }
}

struct Inner<T, O> {
    expected: usize,
    owner: O,
    state: Mutex<State<T, O>>,
}

/// Tracks a fixed number of tasks and settles once all of them have reported.
///
/// `Future` is a cheap handle: clones refer to the same tracker. Callbacks are
/// attached with [`then`](Self::then), [`error`](Self::error) and
/// [`always`](Self::always) and fire exactly once, in attachment order, when the
/// last expected [`complete`](Self::complete) arrives.
///
/// Every callback receives the owner context `O` and the current final
/// [`Results`]. A callback may reply with `Some(results)` to replace what later
/// callbacks of the same settlement observe.
pub struct Future<T, O = ()> {
    inner: Arc<Inner<T, O>>,
}

impl<T, O> Clone for Future<T, O> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Future<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates a pending future that settles after `expected` completions.
    ///
    /// # Panics
    ///
    /// If `expected` is zero.
    pub fn new(expected: usize) -> Self {
        Self::with_owner(expected, ())
    }

    /// Creates a single-task future that has already settled.
    ///
    /// Useful for returning an immediate verdict (e.g. a request rejected before
    /// it was ever sent) through an API that hands out futures.
    pub fn ready(success: bool, results: impl Into<Results<T>>) -> Self {
        let future = Self::new(1);
        future.inner.state.lock().record(success, results.into());
        future
    }
}

impl<T, O> Future<T, O>
where
    T: Clone + Send + Sync + 'static,
    O: Send + Sync + 'static,
{
    /// Creates a pending future whose callbacks receive `owner` as context.
    ///
    /// # Panics
    ///
    /// If `expected` is zero: a future tracking no tasks has no meaningful
    /// "finished" state.
    pub fn with_owner(expected: usize, owner: O) -> Self {
        assert!(expected >= 1, "a future must track at least one task");
        Self {
            inner: Arc::new(Inner {
                expected,
                owner,
                state: Mutex::new(State {
                    remaining: expected,
                    last_success: true,
                    outcome: None,
                    generation: 0,
                    per_task: Vec::with_capacity(expected),
                    current: None,
                    log: VecDeque::new(),
                    dispatcher: None,
                    waiters: Vec::new(),
                }),
            }),
        }
    }

    /// Reports that one task finished.
    ///
    /// The future settles on the call that brings the remaining count to zero.
    /// Its outcome is taken from that **last** call's `success` flag only; the
    /// flags of earlier calls do not take part.
    ///
    /// # Errors
    ///
    /// - [`FutureError::AlreadySettled`] if every expected task already reported.
    /// - Any error raised by callbacks fired by this settlement, such as
    ///   [`FutureError::MalformedCallbackResult`] or a forwarding fault from
    ///   [`wrap`](Self::wrap). A failing callback does not stop the pass: the
    ///   callbacks after it still fire with the unchanged results, and only the
    ///   first error is returned.
    pub fn complete(
        &self,
        success: bool,
        results: impl Into<Results<T>>,
    ) -> Result<&Self, FutureError> {
        let waiters = {
            let mut state = self.inner.state.lock();
            if state.remaining == 0 {
                return Err(FutureError::AlreadySettled);
            }
            state.record(success, results.into())
        };

        if let Some(waiters) = waiters {
            for waker in waiters {
                waker.wake();
            }
            self.dispatch()?;
        }
        Ok(self)
    }

    /// Fires `callback` on success.
    pub fn then<F>(&self, callback: F) -> Result<&Self, FutureError>
    where
        F: FnOnce(&O, &Results<T>) -> Option<Results<T>> + Send + 'static,
    {
        self.on(Kind::Then, callback)
    }

    /// Fires `callback` on failure.
    pub fn error<F>(&self, callback: F) -> Result<&Self, FutureError>
    where
        F: FnOnce(&O, &Results<T>) -> Option<Results<T>> + Send + 'static,
    {
        self.on(Kind::Error, callback)
    }

    /// Fires `callback` on either outcome.
    pub fn always<F>(&self, callback: F) -> Result<&Self, FutureError>
    where
        F: FnOnce(&O, &Results<T>) -> Option<Results<T>> + Send + 'static,
    {
        self.on(Kind::Always, callback)
    }

    /// Attaches `callback` to the queue named by `kind`.
    ///
    /// On a settled future the callback fires before this returns (if `kind`
    /// matches the outcome) instead of being queued. That includes attaching
    /// from inside another callback of this future: the new callback runs
    /// nested, ahead of callbacks still waiting in the current pass. Attaching
    /// from another thread while a pass is running queues it at the end of
    /// that pass.
    ///
    /// # Errors
    ///
    /// Only when the callback fires immediately and replies with an empty
    /// result set ([`FutureError::MalformedCallbackResult`]).
    pub fn on<F>(&self, kind: Kind, callback: F) -> Result<&Self, FutureError>
    where
        F: FnOnce(&O, &Results<T>) -> Option<Results<T>> + Send + 'static,
    {
        self.attach(kind, Box::new(move |owner: &O, results: &Results<T>| {
            Ok(callback(owner, results))
        }))
    }

    /// Drives `target` with this future's outcome and results once it settles.
    pub fn wrap<U>(&self, target: &Future<T, U>) -> Result<&Self, FutureError>
    where
        U: Send + Sync + 'static,
    {
        let on_success = target.clone();
        let on_failure = target.clone();
        self.attach(
            Kind::Then,
            Box::new(move |_: &O, results: &Results<T>| {
                on_success.complete(true, results.clone())?;
                Ok(None)
            }),
        )?;
        self.attach(
            Kind::Error,
            Box::new(move |_: &O, results: &Results<T>| {
                on_failure.complete(false, results.clone())?;
                Ok(None)
            }),
        )
    }

    /// Runs `step` after this future succeeds and returns a future that settles
    /// with whatever the future produced by `step` settles with.
    ///
    /// A failure of this future does not complete the returned one; it only
    /// ever continues on success.
    pub fn chain<S, F>(&self, step: F) -> Result<Future<T, O>, FutureError>
    where
        O: Clone,
        S: Send + Sync + 'static,
        F: FnOnce(&O, &Results<T>) -> Future<T, S> + Send + 'static,
    {
        let chained = Future::with_owner(1, self.inner.owner.clone());
        let forward_to = chained.clone();
        self.attach(
            Kind::Then,
            Box::new(move |owner: &O, results: &Results<T>| {
                step(owner, results).wrap(&forward_to)?;
                Ok(None)
            }),
        )?;
        Ok(chained)
    }

    /// Reopens the future so it can track more completions.
    ///
    /// With `Some(count)` the remaining count grows by `count`; without it (or
    /// with `Some(0)`) it resets to the original task count. Results recorded so
    /// far are kept and show up again in the next settlement.
    ///
    /// Callbacks are dropped from the queue as they fire, so a rewound future
    /// starts with an empty queue: only callbacks attached afterwards fire on the
    /// next settlement.
    ///
    /// # Errors
    ///
    /// - [`FutureError::NotSettled`] if the future is pending and `force` is false.
    /// - [`FutureError::OverRewind`] if `count` exceeds the completed tasks.
    pub fn rewind(&self, count: Option<usize>, force: bool) -> Result<(), FutureError> {
        let mut state = self.inner.state.lock();
        if state.remaining > 0 && !force {
            return Err(FutureError::NotSettled);
        }

        match count.filter(|&count| count > 0) {
            Some(count) => {
                let completed = self.inner.expected - state.remaining;
                if count > completed {
                    return Err(FutureError::OverRewind {
                        requested: count,
                        completed,
                    });
                }
                state.remaining += count;
            }
            None => state.remaining = self.inner.expected,
        }

        state.outcome = None;
        state.current = None;
        debug!(remaining = state.remaining, force, "future rewound");
        Ok(())
    }

    fn attach(&self, kind: Kind, callback: Callback<T, O>) -> Result<&Self, FutureError> {
        let me = thread::current().id();
        let mut state = self.inner.state.lock();

        // Attached from inside a running callback: fire nested, ahead of the
        // rest of the queue, before this call returns.
        if state.dispatcher == Some(me) {
            if let (Some(outcome), Some(current)) = (state.outcome, state.current.clone()) {
                let generation = state.generation;
                drop(state);
                return match self.fire(kind, callback, outcome, generation, &current) {
                    Some(err) => Err(err),
                    None => Ok(self),
                };
            }
        }

        state.log.push_back((kind, callback));
        let idle = state.outcome.is_some() && state.dispatcher.is_none();
        drop(state);
        if idle {
            self.dispatch()?;
        }
        Ok(self)
    }

    /// Fires queued callbacks in attachment order.
    ///
    /// Only one dispatcher runs per future. Callbacks attached from other threads
    /// are queued and picked up by it; callbacks attached by the dispatcher's own
    /// callbacks fire inline.
    fn dispatch(&self) -> Result<(), FutureError> {
        let me = thread::current().id();
        {
            let mut state = self.inner.state.lock();
            if state.dispatcher.is_some() {
                return Ok(());
            }
            state.dispatcher = Some(me);
        }

        let mut first_error = None;
        loop {
            let (kind, callback, outcome, generation, current) = {
                let mut state = self.inner.state.lock();
                let (Some(outcome), Some(current)) = (state.outcome, state.current.clone()) else {
                    state.dispatcher = None;
                    break;
                };
                let Some((kind, callback)) = state.log.pop_front() else {
                    state.dispatcher = None;
                    break;
                };
                (kind, callback, outcome, state.generation, current)
            };

            if let Some(err) = self.fire(kind, callback, outcome, generation, &current) {
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Runs one callback if `kind` matches `outcome` and applies its reply.
    fn fire(
        &self,
        kind: Kind,
        callback: Callback<T, O>,
        outcome: Outcome,
        generation: u64,
        current: &Results<T>,
    ) -> Option<FutureError> {
        if !kind.matches(outcome) {
            return None;
        }

        match callback(&self.inner.owner, current) {
            Ok(None) => None,
            Ok(Some(replacement)) if replacement.is_empty() => {
                warn!(?kind, "callback replied with an empty result set");
                Some(FutureError::MalformedCallbackResult)
            }
            Ok(Some(replacement)) => {
                let mut state = self.inner.state.lock();
                if state.generation == generation && state.outcome.is_some() {
                    state.current = Some(Arc::new(replacement));
                }
                None
            }
            Err(err) => {
                warn!(?kind, %err, "callback failed");
                Some(err)
            }
        }
    }
}

impl<T, O> Future<T, O> {
    /// Number of completions needed to settle.
    pub fn expected(&self) -> usize {
        self.inner.expected
    }

    pub fn remaining(&self) -> usize {
        self.inner.state.lock().remaining
    }

    /// Completions recorded towards the current settlement.
    pub fn completed(&self) -> usize {
        self.inner.expected - self.remaining()
    }

    pub fn is_settled(&self) -> bool {
        self.inner.state.lock().outcome.is_some()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.inner.state.lock().outcome
    }

    /// Final result as seen by the next callback, once settled.
    pub fn results(&self) -> Option<Arc<Results<T>>> {
        self.inner.state.lock().current.clone()
    }

    pub fn owner(&self) -> &O {
        &self.inner.owner
    }

    /// Resolves with the outcome once the future settles.
    pub fn settled(&self) -> Settled<T, O> {
        Settled {
            future: self.clone(),
        }
    }
}

impl<T, O> fmt::Debug for Future<T, O> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Future")
            .field("expected", &self.inner.expected)
            .field("remaining", &state.remaining)
            .field("outcome", &state.outcome)
            .field("queued", &state.log.len())
            .finish()
    }
}

/// Awaitable returned by [`Future::settled`].
pub struct Settled<T, O> {
    future: Future<T, O>,
}

impl<T, O> std::future::Future for Settled<T, O> {
    type Output = Outcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.future.inner.state.lock();
        match state.outcome {
            Some(outcome) => Poll::Ready(outcome),
            None => {
                if !state.waiters.iter().any(|w| w.will_wake(cx.waker())) {
                    state.waiters.push(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }
}
