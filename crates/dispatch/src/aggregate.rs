//! Binding between a domain and the dispatch pipeline.

use std::fmt;

use behavior::{AggregateState, Behavior, DomainEvent};
use event_store::Version;

/// Binds a domain's types and behavior table to the dispatch pipeline.
///
/// The implementing type is a marker; state lives in the per-identity
/// worker as an [`AggregateState<Snapshot>`] and is rebuilt from the
/// event log on activation.
pub trait AggregateBehavior: Send + Sync + 'static {
    /// Identifies this aggregate type in persisted records (e.g. "lottery").
    const AGGREGATE_TYPE: &'static str;

    /// The immutable value representing the aggregate's data.
    type Snapshot: Clone + Send + Sync + 'static;

    /// The set of commands dispatched to this aggregate.
    type Command: Send + 'static;

    /// The set of events this aggregate emits and applies.
    type Event: DomainEvent + 'static;

    /// The cause carried by an explicit command rejection.
    type Rejection: fmt::Debug + fmt::Display + Send + 'static;

    /// Builds the behavior table for this aggregate.
    ///
    /// Called once per [`AggregateService`](crate::AggregateService) and
    /// shared by all of its workers, so the definition must be
    /// state-independent; state dependence belongs in the guards.
    fn behavior() -> Behavior<Self::Snapshot, Self::Command, Self::Event, Self::Rejection>;
}

/// The result of a successful dispatch.
pub struct Dispatched<A: AggregateBehavior> {
    /// The events that were durably appended, in emission order. Empty
    /// when the matched handler decided the command was a no-op.
    pub events: Vec<A::Event>,

    /// The aggregate state after applying the events.
    pub state: AggregateState<A::Snapshot>,

    /// The aggregate's version after the append.
    pub version: Version,
}

impl<A: AggregateBehavior> fmt::Debug for Dispatched<A>
where
    A::Event: fmt::Debug,
    A::Snapshot: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatched")
            .field("events", &self.events)
            .field("state", &self.state)
            .field("version", &self.version)
            .finish()
    }
}
