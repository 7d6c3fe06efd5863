//! Persistence collaborator for the aggregate behavior engine.
//!
//! Defines the contract the dispatcher relies on (atomic, ordered,
//! version-checked appends and replayable loads) plus an in-memory
//! implementation with the same conflict semantics a durable backend
//! must provide.

pub mod error;
pub mod memory;
pub mod record;
pub mod store;

pub use common::AggregateId;
pub use error::{EventStoreError, Result};
pub use memory::InMemoryEventStore;
pub use record::{EventId, EventRecord, EventRecordBuilder, Version};
pub use store::{AppendOptions, EventStore};
