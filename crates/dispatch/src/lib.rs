//! Command lifecycle orchestration for event-sourced aggregates.
//!
//! One worker task owns each aggregate identity: commands for the same
//! identity are processed strictly one at a time in arrival order, while
//! distinct identities proceed in parallel. The worker rebuilds state by
//! replaying the event log on activation, then drives each command
//! through resolution, validation, persistence, and event application.

pub mod aggregate;
pub mod error;
pub mod service;
mod worker;

pub use aggregate::{AggregateBehavior, Dispatched};
pub use error::DispatchError;
pub use service::AggregateService;
