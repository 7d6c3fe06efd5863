//! Composable command/event handler rule sets.

use crate::outcome::CommandOutcome;

type CommandPredicate<S, C> = Box<dyn Fn(Option<&S>, &C) -> bool + Send + Sync>;
type CommandHandlerFn<S, C, E, R> =
    Box<dyn Fn(Option<&S>, &C) -> CommandOutcome<E, R> + Send + Sync>;
type ConstructPredicate<E> = Box<dyn Fn(&E) -> bool + Send + Sync>;
type ConstructFn<S, E> = Box<dyn Fn(&E) -> S + Send + Sync>;
type UpdatePredicate<S, E> = Box<dyn Fn(&S, &E) -> bool + Send + Sync>;
type UpdateFn<S, E> = Box<dyn Fn(S, &E) -> S + Send + Sync>;

/// One command handler rule: a predicate over (state shape, command)
/// and the handler invoked when it matches.
struct CommandRule<S, C, E, R> {
    predicate: CommandPredicate<S, C>,
    handler: CommandHandlerFn<S, C, E, R>,
}

/// One event handler rule, in one of its two arities.
enum EventRule<S, E> {
    /// Builds the first snapshot; applies only while no snapshot exists.
    Construct {
        predicate: ConstructPredicate<E>,
        build: ConstructFn<S, E>,
    },

    /// Transforms an existing snapshot into the next one.
    Update {
        predicate: UpdatePredicate<S, E>,
        apply: UpdateFn<S, E>,
    },
}

/// An ordered, composable bundle of command and event handler rules.
///
/// Rules are consulted in registration order and overlapping predicates
/// resolve first-registered-wins, so a set stays deterministic under
/// [`combine`](ActionSet::combine): `a.combine(b)` keeps all of `a`'s
/// rules ahead of `b`'s. This makes a base set of reusable actions
/// (e.g. "accept participants") mixable into several state-specific
/// sets, with each state free to register more specific rules in front.
pub struct ActionSet<S, C, E, R> {
    command_rules: Vec<CommandRule<S, C, E, R>>,
    event_rules: Vec<EventRule<S, E>>,
}

impl<S, C, E, R> Default for ActionSet<S, C, E, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, C, E, R> ActionSet<S, C, E, R> {
    /// Creates an empty action set.
    pub fn new() -> Self {
        Self {
            command_rules: Vec::new(),
            event_rules: Vec::new(),
        }
    }

    /// Registers a command handler rule behind all previously registered
    /// command rules.
    ///
    /// The handler returns a [`CommandOutcome`]; use its constructors
    /// (`emit`, `emit_all`, `reject`, `defer`, or `From<Result>`) to
    /// normalize whichever shape the handler logic naturally has.
    pub fn on_command<P, H>(mut self, predicate: P, handler: H) -> Self
    where
        P: Fn(Option<&S>, &C) -> bool + Send + Sync + 'static,
        H: Fn(Option<&S>, &C) -> CommandOutcome<E, R> + Send + Sync + 'static,
    {
        self.command_rules.push(CommandRule {
            predicate: Box::new(predicate),
            handler: Box::new(handler),
        });
        self
    }

    /// Registers a construction rule: builds the first snapshot from an
    /// event. Considered only while the aggregate has no snapshot.
    pub fn on_construct<P, F>(mut self, predicate: P, build: F) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
        F: Fn(&E) -> S + Send + Sync + 'static,
    {
        self.event_rules.push(EventRule::Construct {
            predicate: Box::new(predicate),
            build: Box::new(build),
        });
        self
    }

    /// Registers an update rule: transforms the current snapshot with an
    /// event. Considered only once a snapshot exists.
    pub fn on_update<P, F>(mut self, predicate: P, apply: F) -> Self
    where
        P: Fn(&S, &E) -> bool + Send + Sync + 'static,
        F: Fn(S, &E) -> S + Send + Sync + 'static,
    {
        self.event_rules.push(EventRule::Update {
            predicate: Box::new(predicate),
            apply: Box::new(apply),
        });
        self
    }

    /// Combines two sets, keeping `self`'s rules ahead of `other`'s in
    /// both rule lists. Purely structural; no rules are dropped.
    pub fn combine(mut self, other: Self) -> Self {
        self.command_rules.extend(other.command_rules);
        self.event_rules.extend(other.event_rules);
        self
    }

    /// Invokes the first command rule matching (state shape, command).
    ///
    /// Returns `None` when no rule matches, which the dispatch layer
    /// surfaces as "command not handled". Exactly one rule is invoked.
    pub fn decide(&self, snapshot: Option<&S>, command: &C) -> Option<CommandOutcome<E, R>> {
        self.command_rules
            .iter()
            .find(|rule| (rule.predicate)(snapshot, command))
            .map(|rule| (rule.handler)(snapshot, command))
    }

    /// Applies the first event rule matching the event and the current
    /// snapshot arity.
    ///
    /// Construction rules are consulted only when `snapshot` is `None`,
    /// update rules only when it is `Some`. Returns `None` when no rule
    /// accepts the event, a coverage defect the caller must treat as
    /// fatal.
    pub fn apply_event(&self, snapshot: Option<S>, event: &E) -> Option<S> {
        match snapshot {
            None => self.event_rules.iter().find_map(|rule| match rule {
                EventRule::Construct { predicate, build } if predicate(event) => {
                    Some(build(event))
                }
                _ => None,
            }),
            Some(current) => {
                for rule in &self.event_rules {
                    if let EventRule::Update { predicate, apply } = rule
                        && predicate(&current, event)
                    {
                        return Some(apply(current, event));
                    }
                }
                None
            }
        }
    }

    /// Number of registered command rules.
    pub fn command_rule_count(&self) -> usize {
        self.command_rules.len()
    }

    /// Number of registered event rules.
    pub fn event_rule_count(&self) -> usize {
        self.event_rules.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Set = ActionSet<u32, &'static str, &'static str, &'static str>;

    fn tagged(tag: &'static str, on: &'static str) -> Set {
        ActionSet::new().on_command(
            move |_, cmd| *cmd == on,
            move |_, _| CommandOutcome::emit(tag),
        )
    }

    async fn selected(set: &Set, command: &'static str) -> Option<&'static str> {
        let events = set.decide(None, &command)?.resolve().await.ok()?;
        events.first().copied()
    }

    #[tokio::test]
    async fn first_registered_rule_wins() {
        let set = tagged("first", "go").combine(tagged("second", "go"));
        assert_eq!(selected(&set, "go").await, Some("first"));
    }

    #[tokio::test]
    async fn combine_keeps_self_rules_ahead() {
        let base = tagged("base", "go");
        let specific = tagged("specific", "go").combine(base);
        assert_eq!(selected(&specific, "go").await, Some("specific"));
    }

    #[tokio::test]
    async fn combine_is_associative_for_selection() {
        let left = tagged("a", "go")
            .combine(tagged("b", "go"))
            .combine(tagged("c", "other"));
        let right = tagged("a", "go").combine(tagged("b", "go").combine(tagged("c", "other")));

        assert_eq!(selected(&left, "go").await, selected(&right, "go").await);
        assert_eq!(
            selected(&left, "other").await,
            selected(&right, "other").await
        );
        assert_eq!(left.command_rule_count(), right.command_rule_count());
    }

    #[tokio::test]
    async fn no_matching_rule_yields_none() {
        let set = tagged("only", "go");
        assert!(set.decide(None, &"unknown").is_none());
    }

    #[test]
    fn construct_rules_need_absent_snapshot() {
        let set: ActionSet<u32, &str, &str, &str> = ActionSet::new()
            .on_construct(|event| *event == "created", |_| 1)
            .on_update(|_, event| *event == "created", |state, _| state + 100);

        // No snapshot: the construction rule applies.
        assert_eq!(set.apply_event(None, &"created"), Some(1));
        // With a snapshot: only the update rule is considered.
        assert_eq!(set.apply_event(Some(1), &"created"), Some(101));
    }

    #[test]
    fn unmatched_event_yields_none() {
        let set: ActionSet<u32, &str, &str, &str> =
            ActionSet::new().on_construct(|event| *event == "created", |_| 1);

        assert_eq!(set.apply_event(None, &"unknown"), None);
        // Update arity with only a construction rule registered.
        assert_eq!(set.apply_event(Some(1), &"created"), None);
    }

    #[test]
    fn combine_concatenates_event_rules_in_order() {
        let first: ActionSet<u32, &str, &str, &str> =
            ActionSet::new().on_update(|_, _| true, |s, _| s + 1);
        let second: ActionSet<u32, &str, &str, &str> =
            ActionSet::new().on_update(|_, _| true, |s, _| s + 10);

        let set = first.combine(second);
        assert_eq!(set.event_rule_count(), 2);
        // The first-registered update rule takes the event.
        assert_eq!(set.apply_event(Some(0), &"tick"), Some(1));
    }
}
