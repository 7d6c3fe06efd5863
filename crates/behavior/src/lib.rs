//! State-dependent behavior for event-sourced aggregates.
//!
//! The core pieces, leaves first:
//! - [`CommandOutcome`]: the single normalized result every command
//!   handler shape collapses to.
//! - [`ActionSet`]: an ordered, composable bundle of command handler and
//!   event handler rules.
//! - [`Behavior`]: an ordered table of (state guard, [`ActionSet`])
//!   entries, resolved first-match-wins against the current
//!   [`AggregateState`].
//!
//! Everything here is pure: no I/O, no clocks, no persistence. The
//! dispatch layer drives these types through the command lifecycle.

pub mod action_set;
pub mod error;
pub mod event;
pub mod outcome;
pub mod state;
pub mod table;

pub use action_set::ActionSet;
pub use error::BehaviorError;
pub use event::DomainEvent;
pub use outcome::CommandOutcome;
pub use state::AggregateState;
pub use table::Behavior;
