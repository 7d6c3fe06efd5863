//! Normalized command handler result.

use std::future::Future;

use futures_util::future::BoxFuture;

/// The single result contract every command handler shape collapses to:
/// `Ok(events)` or a rejection, available now or later.
///
/// Handlers come in five source shapes (single event, event list,
/// fallible, and their asynchronous counterparts); the convenience
/// constructors below normalize all of them. `Ready` outcomes resolve
/// within the dispatcher's current turn with zero suspension; `Deferred`
/// outcomes suspend only the aggregate identity being dispatched.
pub enum CommandOutcome<E, R> {
    /// The handler decided synchronously.
    Ready(Result<Vec<E>, R>),

    /// The decision becomes available once the boxed future resolves.
    Deferred(BoxFuture<'static, Result<Vec<E>, R>>),
}

impl<E, R> CommandOutcome<E, R> {
    /// Accepts the command, emitting a single event.
    pub fn emit(event: E) -> Self {
        Self::Ready(Ok(vec![event]))
    }

    /// Accepts the command, emitting events in the given order.
    pub fn emit_all(events: Vec<E>) -> Self {
        Self::Ready(Ok(events))
    }

    /// Rejects the command with the given cause.
    pub fn reject(cause: R) -> Self {
        Self::Ready(Err(cause))
    }

    /// Defers the decision to a future.
    ///
    /// The future must own everything it needs; the handler's borrows of
    /// state and command end when the handler returns.
    pub fn defer<F>(future: F) -> Self
    where
        F: Future<Output = Result<Vec<E>, R>> + Send + 'static,
    {
        Self::Deferred(Box::pin(future))
    }

    /// Returns true if the outcome resolves without suspension.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Resolves the outcome, awaiting the deferred arm if necessary.
    pub async fn resolve(self) -> Result<Vec<E>, R> {
        match self {
            Self::Ready(result) => result,
            Self::Deferred(future) => future.await,
        }
    }
}

impl<E, R> From<Result<Vec<E>, R>> for CommandOutcome<E, R> {
    fn from(result: Result<Vec<E>, R>) -> Self {
        Self::Ready(result)
    }
}

impl<E, R> std::fmt::Debug for CommandOutcome<E, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready(_) => f.write_str("CommandOutcome::Ready"),
            Self::Deferred(_) => f.write_str("CommandOutcome::Deferred"),
        }
    }
}
