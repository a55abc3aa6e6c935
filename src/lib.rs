//! Mortar
//!
//! A small completion-tracking primitive for coordinating independently finishing
//! tasks into a single observable outcome.
//!
//! # Core Concept
//!
//! A [`Future`] is created with the number of tasks it waits for. Each task reports
//! through [`Future::complete`] with a success flag and a tuple of result values.
//! When the last expected task reports, the future **settles**:
//!
//! - **Outcome**: taken from the success flag of the *last* completion observed
//! - **Final result**: the lone result tuple for a one-task future, otherwise every
//!   tuple in arrival order ([`Results::Batch`])
//! - **Callbacks**: everything attached through `then`/`error`/`always` fires once,
//!   in attachment order, filtered by outcome
//!
//! Callbacks receive the future's owner context explicitly and may replace the
//! final result for the callbacks after them.
//!
//! # Critical Invariants
//!
//! 1. **Settles once**: a future with `expected = N` settles after exactly N
//!    completions; an extra completion is [`FutureError::AlreadySettled`]
//! 2. **Ordered delivery**: callbacks fire in the order they were attached, never
//!    grouped by kind, even when attached from several threads
//! 3. **Late attachment**: a callback attached to a settled future fires before
//!    the attaching call returns
//! 4. **No replay**: fired callbacks leave the queue; [`Future::rewind`] reopens the
//!    future with an empty queue
//!
//! # Composition
//!
//! - [`Future::wrap`] forwards this future's outcome into another future
//! - [`Future::chain`] runs a step producing a new future after success, and returns
//!   a future that settles with the step's result
//!
//! # Batches
//!
//! A batch is a usage pattern rather than a type: create `Future::new(n)`, launch
//! `n` operations, and call `complete` from each one as it finishes.
//!
//! ```ignore
//! let batch = Future::new(urls.len());
//! batch
//!     .then(|_, results| {
//!         println!("all {} fetched", results.len());
//!         None
//!     })?
//!     .error(|_, _| {
//!         println!("the last fetch to finish failed");
//!         None
//!     })?;
//!
//! for url in urls {
//!     let batch = batch.clone();
//!     spawn_fetch(url, move |ok, body| {
//!         let _ = batch.complete(ok, vec![body]);
//!     });
//! }
//! ```

pub mod error;
pub mod future;
pub mod results;

pub use error::FutureError;
pub use future::{Future, Settled};
pub use results::{Kind, Outcome, Results};
