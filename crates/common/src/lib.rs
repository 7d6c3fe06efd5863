//! Shared types for the aggregate behavior engine.

pub mod types;

pub use types::AggregateId;
