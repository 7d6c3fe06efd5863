use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    AggregateId, EventRecord, EventStoreError, Result, Version,
    store::{AppendOptions, EventStore, validate_records_for_append},
};

/// In-memory event store.
///
/// Backs the test suites and serves as the reference for the conflict
/// semantics a durable implementation must provide. Cloning shares the
/// underlying log.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    records: Arc<RwLock<Vec<EventRecord>>>,
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory event store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of records stored, across all aggregates.
    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }

    /// Clears all records.
    pub async fn clear(&self) {
        self.records.write().await.clear();
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, records: Vec<EventRecord>, options: AppendOptions) -> Result<Version> {
        validate_records_for_append(&records)?;

        let aggregate_id = records[0].aggregate_id;
        let mut log = self.records.write().await;

        let current_version = log
            .iter()
            .filter(|r| r.aggregate_id == aggregate_id)
            .map(|r| r.version)
            .max()
            .unwrap_or(Version::initial());

        if let Some(expected) = options.expected_version
            && current_version != expected
        {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual: current_version,
            });
        }

        // Even without an expected version, a batch must continue the
        // aggregate's sequence (unique version constraint simulation).
        if records[0].version != current_version.next() {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected: options.expected_version.unwrap_or(current_version),
                actual: current_version,
            });
        }

        let last_version = records
            .last()
            .map(|r| r.version)
            .unwrap_or(Version::initial());
        log.extend(records);

        Ok(last_version)
    }

    async fn load(&self, aggregate_id: AggregateId) -> Result<Vec<EventRecord>> {
        let log = self.records.read().await;
        let mut records: Vec<_> = log
            .iter()
            .filter(|r| r.aggregate_id == aggregate_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.version);
        Ok(records)
    }

    async fn current_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        let log = self.records.read().await;
        let version = log
            .iter()
            .filter(|r| r.aggregate_id == aggregate_id)
            .map(|r| r.version)
            .max();
        Ok(version)
    }
}
