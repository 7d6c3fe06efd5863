use common::AggregateId;
use thiserror::Error;

/// Fatal defects in a behavior definition.
///
/// Both variants mean the behavior table does not cover a reachable
/// state or event. They are coverage bugs to fix, not recoverable
/// runtime conditions: the dispatch layer aborts the affected aggregate
/// instance instead of retrying.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BehaviorError {
    /// No behavior entry guard matched the aggregate's current state.
    #[error("no behavior entry matches the current state of aggregate {id}")]
    Unmatched {
        /// The aggregate whose state fell through the table.
        id: AggregateId,
    },

    /// An event has no matching event handler rule for the current
    /// state shape.
    #[error("no event handler accepts `{event_type}` in the current state of aggregate {id}")]
    EventHandlerNotDefined {
        /// The aggregate being applied to.
        id: AggregateId,
        /// Type tag of the uncovered event.
        event_type: &'static str,
    },
}
