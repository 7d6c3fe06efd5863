//! The behavior table: state-guarded action set resolution.

use crate::action_set::ActionSet;
use crate::error::BehaviorError;
use crate::event::DomainEvent;
use crate::state::AggregateState;

type GuardFn<S> = Box<dyn Fn(&AggregateState<S>) -> bool + Send + Sync>;

/// One table entry: a pure guard over the aggregate state paired with
/// the action set that applies while the guard holds.
struct BehaviorEntry<S, C, E, R> {
    guard: GuardFn<S>,
    actions: ActionSet<S, C, E, R>,
}

/// The full mapping from aggregate state to applicable actions.
///
/// Entries are evaluated top-down in registration order and the first
/// matching guard wins; exactly one [`ActionSet`] is selected per
/// dispatch. A state no guard covers is a [`BehaviorError::Unmatched`]
/// configuration defect, not a user error.
pub struct Behavior<S, C, E, R> {
    entries: Vec<BehaviorEntry<S, C, E, R>>,
}

impl<S, C, E, R> Default for Behavior<S, C, E, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, C, E, R> Behavior<S, C, E, R> {
    /// Creates an empty behavior table.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Appends an entry behind all previously registered entries.
    ///
    /// Guards are pure predicates over the state's shape and snapshot
    /// fields (e.g. "not yet constructed", "has a winner").
    pub fn when<G>(mut self, guard: G, actions: ActionSet<S, C, E, R>) -> Self
    where
        G: Fn(&AggregateState<S>) -> bool + Send + Sync + 'static,
    {
        self.entries.push(BehaviorEntry {
            guard: Box::new(guard),
            actions,
        });
        self
    }

    /// Resolves the action set for the given state, first-match-wins.
    pub fn resolve(
        &self,
        state: &AggregateState<S>,
    ) -> Result<&ActionSet<S, C, E, R>, BehaviorError> {
        self.entries
            .iter()
            .find(|entry| (entry.guard)(state))
            .map(|entry| &entry.actions)
            .ok_or(BehaviorError::Unmatched { id: state.id() })
    }
}

impl<S, C, E, R> Behavior<S, C, E, R>
where
    E: DomainEvent,
{
    /// Applies one event, yielding the next state.
    ///
    /// The action set is resolved against the state *before* the event;
    /// construction rules fire while uninitialized, update rules once a
    /// snapshot exists. The result is always `Initialized` with the same
    /// identity and a freshly built snapshot.
    pub fn apply(
        &self,
        state: AggregateState<S>,
        event: &E,
    ) -> Result<AggregateState<S>, BehaviorError> {
        let actions = self.resolve(&state)?;
        let id = state.id();
        let next = actions
            .apply_event(state.into_snapshot(), event)
            .ok_or(BehaviorError::EventHandlerNotDefined {
                id,
                event_type: event.event_type(),
            })?;
        Ok(AggregateState::initialized(id, next))
    }

    /// Folds a sequence of events through [`apply`](Behavior::apply) in
    /// order, threading each snapshot into the next application.
    ///
    /// Both live dispatch and replay go through this fold, which is what
    /// makes replay reconstruct exactly the state live dispatch reached.
    pub fn fold<'a, I>(
        &self,
        mut state: AggregateState<S>,
        events: I,
    ) -> Result<AggregateState<S>, BehaviorError>
    where
        I: IntoIterator<Item = &'a E>,
        E: 'a,
    {
        for event in events {
            state = self.apply(state, event)?;
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use common::AggregateId;
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::outcome::CommandOutcome;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    enum TallyEvent {
        Opened,
        Counted { amount: u32 },
        Sealed,
    }

    impl DomainEvent for TallyEvent {
        fn event_type(&self) -> &'static str {
            match self {
                TallyEvent::Opened => "Opened",
                TallyEvent::Counted { .. } => "Counted",
                TallyEvent::Sealed => "Sealed",
            }
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Tally {
        total: u32,
        sealed: bool,
    }

    type TallyBehavior = Behavior<Tally, &'static str, TallyEvent, &'static str>;

    fn tally_behavior() -> TallyBehavior {
        let factory = ActionSet::new()
            .on_command(
                |_, cmd: &&str| *cmd == "open",
                |_, _| CommandOutcome::emit(TallyEvent::Opened),
            )
            .on_construct(
                |event| matches!(event, TallyEvent::Opened),
                |_| Tally {
                    total: 0,
                    sealed: false,
                },
            );

        let open = ActionSet::new()
            .on_command(
                |_, cmd: &&str| *cmd == "count",
                |_, _| CommandOutcome::emit(TallyEvent::Counted { amount: 1 }),
            )
            .on_update(
                |_, event| matches!(event, TallyEvent::Counted { .. }),
                |mut tally: Tally, event| {
                    if let TallyEvent::Counted { amount } = event {
                        tally.total += amount;
                    }
                    tally
                },
            )
            .on_update(
                |_, event| matches!(event, TallyEvent::Sealed),
                |mut tally: Tally, _| {
                    tally.sealed = true;
                    tally
                },
            );

        Behavior::new()
            .when(|state| !state.is_initialized(), factory)
            .when(|state| state.is_initialized(), open)
    }

    #[test]
    fn resolve_picks_first_matching_guard() {
        let behavior = tally_behavior();
        let id = AggregateId::new();

        let uninit = AggregateState::uninitialized(id);
        let factory = behavior.resolve(&uninit).unwrap();
        assert_eq!(factory.command_rule_count(), 1);
        assert!(factory.decide(None, &"open").is_some());
        assert!(factory.decide(None, &"count").is_none());

        let init = AggregateState::initialized(
            id,
            Tally {
                total: 0,
                sealed: false,
            },
        );
        let open = behavior.resolve(&init).unwrap();
        assert!(open.decide(init.snapshot(), &"count").is_some());
    }

    #[test]
    fn resolve_without_covering_guard_is_unmatched() {
        let behavior: TallyBehavior =
            Behavior::new().when(|state| state.is_initialized(), ActionSet::new());
        let id = AggregateId::new();

        let result = behavior.resolve(&AggregateState::uninitialized(id));
        assert_eq!(result.err(), Some(BehaviorError::Unmatched { id }));
    }

    #[test]
    fn apply_constructs_then_updates() {
        let behavior = tally_behavior();
        let id = AggregateId::new();

        let state = behavior
            .apply(AggregateState::uninitialized(id), &TallyEvent::Opened)
            .unwrap();
        assert_eq!(
            state.snapshot(),
            Some(&Tally {
                total: 0,
                sealed: false
            })
        );

        let state = behavior
            .apply(state, &TallyEvent::Counted { amount: 5 })
            .unwrap();
        assert_eq!(state.snapshot().unwrap().total, 5);
        assert_eq!(state.id(), id);
    }

    #[test]
    fn fold_threads_snapshots_in_emission_order() {
        let behavior = tally_behavior();
        let id = AggregateId::new();
        let events = vec![
            TallyEvent::Opened,
            TallyEvent::Counted { amount: 2 },
            TallyEvent::Counted { amount: 3 },
            TallyEvent::Sealed,
        ];

        let folded = behavior
            .fold(AggregateState::uninitialized(id), &events)
            .unwrap();

        // Same result as applying one by one.
        let mut stepped = AggregateState::uninitialized(id);
        for event in &events {
            stepped = behavior.apply(stepped, event).unwrap();
        }

        assert_eq!(folded, stepped);
        assert_eq!(
            folded.snapshot(),
            Some(&Tally {
                total: 5,
                sealed: true
            })
        );
    }

    #[test]
    fn uncovered_event_is_a_defect() {
        let behavior = tally_behavior();
        let id = AggregateId::new();

        // `Sealed` has no construction rule.
        let result = behavior.apply(AggregateState::uninitialized(id), &TallyEvent::Sealed);
        assert_eq!(
            result.err(),
            Some(BehaviorError::EventHandlerNotDefined {
                id,
                event_type: "Sealed",
            })
        );
    }
}
