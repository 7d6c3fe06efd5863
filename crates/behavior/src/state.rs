//! Aggregate lifecycle state.

use common::AggregateId;

/// The lifecycle state of an aggregate.
///
/// An aggregate starts `Uninitialized` at first contact and becomes
/// `Initialized` after its first successful construction-time event
/// application. The identity is stable across the transition; the
/// snapshot is an immutable value, replaced wholesale on every event
/// application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregateState<S> {
    /// No events have been applied yet. Never carries a snapshot.
    Uninitialized {
        /// The stable identity assigned at first contact.
        id: AggregateId,
    },

    /// At least one event has been applied. Always carries a snapshot.
    Initialized {
        /// The stable identity assigned at first contact.
        id: AggregateId,
        /// The aggregate's current data.
        snapshot: S,
    },
}

impl<S> AggregateState<S> {
    /// Creates the pre-construction state for an identity.
    pub fn uninitialized(id: AggregateId) -> Self {
        Self::Uninitialized { id }
    }

    /// Creates an initialized state holding a snapshot.
    pub fn initialized(id: AggregateId, snapshot: S) -> Self {
        Self::Initialized { id, snapshot }
    }

    /// Returns the aggregate's identity.
    pub fn id(&self) -> AggregateId {
        match self {
            Self::Uninitialized { id } | Self::Initialized { id, .. } => *id,
        }
    }

    /// Returns the snapshot, if the aggregate has been constructed.
    pub fn snapshot(&self) -> Option<&S> {
        match self {
            Self::Uninitialized { .. } => None,
            Self::Initialized { snapshot, .. } => Some(snapshot),
        }
    }

    /// Consumes the state, returning the snapshot if present.
    pub fn into_snapshot(self) -> Option<S> {
        match self {
            Self::Uninitialized { .. } => None,
            Self::Initialized { snapshot, .. } => Some(snapshot),
        }
    }

    /// Returns true once a construction event has been applied.
    pub fn is_initialized(&self) -> bool {
        matches!(self, Self::Initialized { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uninitialized_carries_only_identity() {
        let id = AggregateId::new();
        let state = AggregateState::<u32>::uninitialized(id);
        assert_eq!(state.id(), id);
        assert!(!state.is_initialized());
        assert_eq!(state.snapshot(), None);
        assert_eq!(state.into_snapshot(), None);
    }

    #[test]
    fn initialized_keeps_identity_and_snapshot() {
        let id = AggregateId::new();
        let state = AggregateState::initialized(id, 42u32);
        assert_eq!(state.id(), id);
        assert!(state.is_initialized());
        assert_eq!(state.snapshot(), Some(&42));
        assert_eq!(state.into_snapshot(), Some(42));
    }
}
