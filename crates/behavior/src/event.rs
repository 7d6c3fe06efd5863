//! Domain event trait.

use serde::{Serialize, de::DeserializeOwned};

/// A domain event: an immutable fact, the only means of state mutation.
///
/// Events are produced by command handlers in emission order and applied
/// in that order; they should be named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// Returns the event's type tag.
    ///
    /// Used for persisted records and for reporting coverage defects;
    /// rule matching itself works on the event value.
    fn event_type(&self) -> &'static str;
}
