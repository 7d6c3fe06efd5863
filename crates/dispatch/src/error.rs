use behavior::BehaviorError;
use event_store::EventStoreError;
use thiserror::Error;

/// Errors that can surface from dispatching a command.
///
/// `CommandNotHandled`, `ValidationFailed`, and `Store` are expected,
/// recoverable outcomes of normal operation. `Behavior` wraps defects in
/// the behavior definition itself; the worker for the affected aggregate
/// aborts after reporting one.
#[derive(Debug, Error)]
pub enum DispatchError<R> {
    /// No command handler rule matched in the aggregate's current state.
    /// The state was not touched.
    #[error("command not handled in the aggregate's current state")]
    CommandNotHandled,

    /// The matched handler explicitly rejected the command. The state
    /// was not touched; the caller decides what happens next.
    #[error("command validation failed: {0}")]
    ValidationFailed(R),

    /// The behavior definition does not cover a reachable state or
    /// event. Fatal for the aggregate instance.
    #[error(transparent)]
    Behavior(#[from] BehaviorError),

    /// The persistence collaborator failed or reported a conflict,
    /// surfaced verbatim. No events were applied; retry policy belongs
    /// to the caller.
    #[error(transparent)]
    Store(#[from] EventStoreError),

    /// An event payload could not be serialized or deserialized.
    #[error("event serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The worker owning this aggregate identity has stopped.
    #[error("the worker for this aggregate is no longer running")]
    WorkerGone,
}

impl<R> DispatchError<R> {
    /// Configuration defects abort the aggregate's worker; everything
    /// else leaves it running.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DispatchError::Behavior(_))
    }
}
