use thiserror::Error;

/// Contract violations raised by [`Future`](crate::Future).
///
/// None of these are transient: they all mean the caller used the primitive
/// incorrectly, so they are returned to the offending call and never retried.
/// A task that *fails* (`complete(false, ..)`) is not an error; it is routed to
/// `error`/`always` callbacks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FutureError {
    /// `complete` was called after every expected task already reported.
    #[error("future completed a second time")]
    AlreadySettled,
    /// `rewind` was called on a pending future without `force`.
    #[error("future has not settled yet; unable to rewind it without force")]
    NotSettled,
    /// `rewind(count)` asked for more steps than have completed.
    #[error("unable to rewind {requested} steps, only {completed} completed")]
    OverRewind { requested: usize, completed: usize },
    /// A callback replied with an empty result set.
    #[error("callback must reply with a non-empty result sequence")]
    MalformedCallbackResult,
}
