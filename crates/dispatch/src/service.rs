//! Aggregate service: routes commands to per-identity workers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use behavior::{AggregateState, Behavior};
use common::AggregateId;
use event_store::{EventStore, Version};
use tokio::sync::Mutex;

use crate::aggregate::{AggregateBehavior, Dispatched};
use crate::error::DispatchError;
use crate::worker::{WorkerHandle, spawn_worker};

/// Effectively infinite idle timeout. `u64::MAX / 2` avoids overflow
/// when tokio adds the duration to the current instant.
const NO_IDLE_TIMEOUT: Duration = Duration::from_secs(u64::MAX / 2);

/// Routes commands to the worker owning the target aggregate identity,
/// spawning workers lazily.
///
/// The service guarantees at most one live worker per identity, which
/// gives the single-writer discipline: same-identity commands are FIFO,
/// distinct identities fully parallel. The behavior table is built once
/// and shared by every worker.
pub struct AggregateService<A: AggregateBehavior> {
    store: Arc<dyn EventStore>,
    behavior: Arc<Behavior<A::Snapshot, A::Command, A::Event, A::Rejection>>,
    workers: Mutex<HashMap<AggregateId, WorkerHandle<A>>>,
    idle_timeout: Duration,
}

impl<A: AggregateBehavior> AggregateService<A> {
    /// Creates a service whose workers never idle out.
    pub fn new(store: impl EventStore + 'static) -> Self {
        Self::with_idle_timeout(store, NO_IDLE_TIMEOUT)
    }

    /// Creates a service whose workers shut down after `idle_timeout`
    /// without messages. A dead worker is respawned on the next contact,
    /// replaying the identity's event log.
    pub fn with_idle_timeout(store: impl EventStore + 'static, idle_timeout: Duration) -> Self {
        Self {
            store: Arc::new(store),
            behavior: Arc::new(A::behavior()),
            workers: Mutex::new(HashMap::new()),
            idle_timeout,
        }
    }

    /// Returns the persistence collaborator backing this service.
    pub fn store(&self) -> &Arc<dyn EventStore> {
        &self.store
    }

    /// Dispatches a command to the aggregate identified by `id`.
    ///
    /// Commands for the same identity are processed strictly one at a
    /// time, in arrival order; this call returns once the command has
    /// been validated, its events durably appended, and the new state
    /// produced.
    ///
    /// # Errors
    ///
    /// * [`DispatchError::CommandNotHandled`]: no rule matched; state untouched.
    /// * [`DispatchError::ValidationFailed`]: the handler rejected the command.
    /// * [`DispatchError::Store`]: append conflict or storage failure; state untouched.
    /// * [`DispatchError::Behavior`]: the behavior definition has a coverage defect.
    /// * [`DispatchError::WorkerGone`]: the owning worker stopped mid-flight.
    #[tracing::instrument(
        skip_all,
        fields(aggregate_type = A::AGGREGATE_TYPE, aggregate_id = %id)
    )]
    pub async fn dispatch(
        &self,
        id: AggregateId,
        command: A::Command,
    ) -> Result<Dispatched<A>, DispatchError<A::Rejection>> {
        metrics::counter!("commands_dispatched_total").increment(1);
        let worker = self.worker(id).await?;
        let result = worker.execute(command).await;
        if let Err(DispatchError::ValidationFailed(_)) = &result {
            metrics::counter!("command_rejections_total").increment(1);
        }
        result
    }

    /// Reads the current state of the aggregate identified by `id`.
    pub async fn state(
        &self,
        id: AggregateId,
    ) -> Result<AggregateState<A::Snapshot>, DispatchError<A::Rejection>> {
        let (state, _) = self.worker(id).await?.state().await?;
        Ok(state)
    }

    /// Reads the current version of the aggregate identified by `id`.
    pub async fn version(&self, id: AggregateId) -> Result<Version, DispatchError<A::Rejection>> {
        let (_, version) = self.worker(id).await?.state().await?;
        Ok(version)
    }

    /// Returns the live worker handle for `id`, spawning (and replaying)
    /// if none exists or the previous worker has stopped.
    ///
    /// The map lock is never held across activation: replaying one
    /// identity's event log must not stall dispatches to other
    /// identities.
    async fn worker(
        &self,
        id: AggregateId,
    ) -> Result<WorkerHandle<A>, DispatchError<A::Rejection>> {
        if let Some(handle) = self.workers.lock().await.get(&id)
            && handle.is_alive()
        {
            return Ok(handle.clone());
        }

        let handle = spawn_worker::<A>(
            Arc::clone(&self.store),
            Arc::clone(&self.behavior),
            id,
            self.idle_timeout,
        )
        .await?;

        let mut workers = self.workers.lock().await;
        workers.retain(|_, existing| existing.is_alive());

        // A concurrent caller may have activated the same identity while
        // this one was replaying. Keep the first worker; the losing one
        // exits as soon as its only handle drops here, having processed
        // nothing.
        if let Some(existing) = workers.get(&id)
            && existing.is_alive()
        {
            return Ok(existing.clone());
        }

        workers.insert(id, handle.clone());
        Ok(handle)
    }
}
