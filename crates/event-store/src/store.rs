use async_trait::async_trait;

use crate::{AggregateId, EventRecord, EventStoreError, Result, Version};

/// Options for appending events to the store.
#[derive(Debug, Clone, Default)]
pub struct AppendOptions {
    /// Expected version of the aggregate for optimistic concurrency control.
    /// If None, no version check is performed (use with caution).
    pub expected_version: Option<Version>,
}

impl AppendOptions {
    /// Creates options with no version check.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options expecting the aggregate to be at a specific version.
    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: Some(version),
        }
    }

    /// Creates options expecting the aggregate to have no events yet.
    pub fn expect_new() -> Self {
        Self {
            expected_version: Some(Version::initial()),
        }
    }
}

/// The persistence collaborator the dispatcher hands produced events to.
///
/// The dispatcher awaits `append` before applying events to state, so an
/// implementation's acknowledgment is the durability boundary. All
/// implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends records to the store atomically, in order.
    ///
    /// If `options.expected_version` is set, the operation fails with
    /// [`EventStoreError::ConcurrencyConflict`] when the aggregate's
    /// current version doesn't match.
    ///
    /// Returns the new version of the aggregate after appending.
    async fn append(&self, records: Vec<EventRecord>, options: AppendOptions) -> Result<Version>;

    /// Retrieves all records for an aggregate, in version order
    /// (oldest first). The result is the replay input for rebuilding
    /// aggregate state.
    async fn load(&self, aggregate_id: AggregateId) -> Result<Vec<EventRecord>>;

    /// Gets the current version of an aggregate.
    ///
    /// Returns None if the aggregate has no events.
    async fn current_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>>;
}

/// Validates a batch of records before appending.
///
/// All records must target the same aggregate and carry sequential
/// versions; an empty batch is rejected.
pub fn validate_records_for_append(records: &[EventRecord]) -> Result<()> {
    let first = records
        .first()
        .ok_or_else(|| EventStoreError::InvalidBatch("empty append batch".to_string()))?;

    let mut expected_version = first.version;
    for record in records.iter().skip(1) {
        if record.aggregate_id != first.aggregate_id {
            return Err(EventStoreError::InvalidBatch(
                "all records must target the same aggregate".to_string(),
            ));
        }
        if record.aggregate_type != first.aggregate_type {
            return Err(EventStoreError::InvalidBatch(
                "all records must carry the same aggregate type".to_string(),
            ));
        }
        expected_version = expected_version.next();
        if record.version != expected_version {
            return Err(EventStoreError::InvalidBatch(format!(
                "record versions must be sequential: expected {expected_version}, got {}",
                record.version
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(aggregate_id: AggregateId, version: Version) -> EventRecord {
        EventRecord::builder()
            .aggregate_id(aggregate_id)
            .aggregate_type("lottery")
            .event_type("ParticipantAdded")
            .version(version)
            .payload_raw(serde_json::json!({}))
            .build()
    }

    #[test]
    fn empty_batch_is_invalid() {
        let result = validate_records_for_append(&[]);
        assert!(matches!(result, Err(EventStoreError::InvalidBatch(_))));
    }

    #[test]
    fn mixed_aggregates_are_invalid() {
        let batch = vec![
            record(AggregateId::new(), Version::first()),
            record(AggregateId::new(), Version::new(2)),
        ];
        assert!(matches!(
            validate_records_for_append(&batch),
            Err(EventStoreError::InvalidBatch(_))
        ));
    }

    #[test]
    fn version_gaps_are_invalid() {
        let id = AggregateId::new();
        let batch = vec![record(id, Version::first()), record(id, Version::new(3))];
        assert!(matches!(
            validate_records_for_append(&batch),
            Err(EventStoreError::InvalidBatch(_))
        ));
    }

    #[test]
    fn sequential_batch_is_valid() {
        let id = AggregateId::new();
        let batch = vec![
            record(id, Version::first()),
            record(id, Version::new(2)),
            record(id, Version::new(3)),
        ];
        assert!(validate_records_for_append(&batch).is_ok());
    }
}
