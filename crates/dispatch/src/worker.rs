//! Per-identity worker task owning an aggregate's state.
//!
//! The worker is the single writer for its identity: it processes
//! messages from an mpsc channel strictly in arrival order, so commands
//! queue FIFO while a handler or append is in flight. Other identities
//! run on their own workers and are never blocked.

use std::sync::Arc;
use std::time::Duration;

use behavior::{AggregateState, Behavior, DomainEvent};
use common::AggregateId;
use event_store::{AppendOptions, EventRecord, EventStore, Version};
use tokio::sync::{mpsc, oneshot};

use crate::aggregate::{AggregateBehavior, Dispatched};
use crate::error::DispatchError;

type BehaviorFor<A> = Behavior<
    <A as AggregateBehavior>::Snapshot,
    <A as AggregateBehavior>::Command,
    <A as AggregateBehavior>::Event,
    <A as AggregateBehavior>::Rejection,
>;

pub(crate) type DispatchResult<A> =
    Result<Dispatched<A>, DispatchError<<A as AggregateBehavior>::Rejection>>;

/// Messages sent from the service to a worker. Each variant carries a
/// oneshot sender for the worker to reply on.
pub(crate) enum WorkerMessage<A: AggregateBehavior> {
    /// Dispatch a command against the aggregate.
    Execute {
        command: A::Command,
        reply: oneshot::Sender<DispatchResult<A>>,
    },

    /// Read the current state and version.
    GetState {
        reply: oneshot::Sender<(AggregateState<A::Snapshot>, Version)>,
    },
}

/// Cloneable handle to a running worker.
pub(crate) struct WorkerHandle<A: AggregateBehavior> {
    sender: mpsc::Sender<WorkerMessage<A>>,
}

// Manual Clone: only the sender is cloned, so `A` itself need not be Clone.
impl<A: AggregateBehavior> Clone for WorkerHandle<A> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<A: AggregateBehavior> WorkerHandle<A> {
    /// Sends a command to the worker and waits for the outcome.
    pub(crate) async fn execute(&self, command: A::Command) -> DispatchResult<A> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(WorkerMessage::Execute { command, reply: tx })
            .await
            .map_err(|_| DispatchError::WorkerGone)?;
        rx.await.map_err(|_| DispatchError::WorkerGone)?
    }

    /// Reads the current state and version.
    pub(crate) async fn state(
        &self,
    ) -> Result<(AggregateState<A::Snapshot>, Version), DispatchError<A::Rejection>> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(WorkerMessage::GetState { reply: tx })
            .await
            .map_err(|_| DispatchError::WorkerGone)?;
        rx.await.map_err(|_| DispatchError::WorkerGone)
    }

    /// Whether the worker task behind this handle is still running.
    pub(crate) fn is_alive(&self) -> bool {
        !self.sender.is_closed()
    }
}

/// Replays the identity's event log and starts its worker task.
///
/// State is fully rebuilt before the worker accepts any command; a
/// replay failure aborts activation and surfaces to the caller.
pub(crate) async fn spawn_worker<A: AggregateBehavior>(
    store: Arc<dyn EventStore>,
    behavior: Arc<BehaviorFor<A>>,
    id: AggregateId,
    idle_timeout: Duration,
) -> Result<WorkerHandle<A>, DispatchError<A::Rejection>> {
    let (state, version) = replay::<A>(store.as_ref(), &behavior, id).await?;
    let (tx, rx) = mpsc::channel(32);
    tokio::spawn(run_worker::<A>(
        store,
        behavior,
        state,
        version,
        rx,
        idle_timeout,
    ));
    Ok(WorkerHandle { sender: tx })
}

/// Rebuilds state by folding the persisted events from `Uninitialized`,
/// in persisted order.
async fn replay<A: AggregateBehavior>(
    store: &dyn EventStore,
    behavior: &BehaviorFor<A>,
    id: AggregateId,
) -> Result<(AggregateState<A::Snapshot>, Version), DispatchError<A::Rejection>> {
    let records = store.load(id).await?;
    let mut state = AggregateState::uninitialized(id);
    let mut version = Version::initial();

    for record in records {
        let event: A::Event = serde_json::from_value(record.payload)?;
        state = behavior.apply(state, &event)?;
        version = record.version;
    }

    if state.is_initialized() {
        tracing::debug!(
            aggregate_type = A::AGGREGATE_TYPE,
            aggregate_id = %id,
            %version,
            "aggregate state rebuilt from event log"
        );
    }

    Ok((state, version))
}

/// The worker loop. Exits when the channel closes, the idle timeout
/// elapses, or a configuration defect aborts the instance.
async fn run_worker<A: AggregateBehavior>(
    store: Arc<dyn EventStore>,
    behavior: Arc<BehaviorFor<A>>,
    mut state: AggregateState<A::Snapshot>,
    mut version: Version,
    mut rx: mpsc::Receiver<WorkerMessage<A>>,
    idle_timeout: Duration,
) {
    loop {
        let msg = match tokio::time::timeout(idle_timeout, rx.recv()).await {
            Ok(Some(msg)) => msg,
            // Channel closed: all handles dropped.
            Ok(None) => break,
            Err(_elapsed) => {
                tracing::debug!(
                    aggregate_type = A::AGGREGATE_TYPE,
                    aggregate_id = %state.id(),
                    "worker idle, shutting down"
                );
                break;
            }
        };

        match msg {
            WorkerMessage::Execute { command, reply } => {
                let result = execute_command::<A>(
                    store.as_ref(),
                    &behavior,
                    &mut state,
                    &mut version,
                    command,
                )
                .await;

                match result {
                    Err(err) if err.is_fatal() => {
                        tracing::error!(
                            aggregate_type = A::AGGREGATE_TYPE,
                            aggregate_id = %state.id(),
                            error = %err,
                            "behavior definition defect, aborting aggregate instance"
                        );
                        let _ = reply.send(Err(err));
                        break;
                    }
                    other => {
                        // A dropped receiver means the caller stopped
                        // waiting; discard the result.
                        let _ = reply.send(other);
                    }
                }
            }

            WorkerMessage::GetState { reply } => {
                let _ = reply.send((state.clone(), version));
            }
        }
    }
}

/// Runs one command through the full pipeline:
/// resolve → match → invoke → normalize → append → apply.
async fn execute_command<A: AggregateBehavior>(
    store: &dyn EventStore,
    behavior: &BehaviorFor<A>,
    state: &mut AggregateState<A::Snapshot>,
    version: &mut Version,
    command: A::Command,
) -> DispatchResult<A> {
    // 1. Resolve the action set for the current state. A miss here is a
    //    coverage defect in the behavior table.
    let actions = behavior.resolve(state)?;

    // 2. Match a command rule and invoke it. Deferred outcomes suspend
    //    only this worker; queued commands wait their turn.
    let outcome = actions
        .decide(state.snapshot(), &command)
        .ok_or(DispatchError::CommandNotHandled)?;
    let events = outcome
        .resolve()
        .await
        .map_err(DispatchError::ValidationFailed)?;

    // 3. A matched handler may decide the command is a no-op.
    if events.is_empty() {
        return Ok(Dispatched {
            events,
            state: state.clone(),
            version: *version,
        });
    }

    // 4. Append durably before touching state. The pre-command version
    //    is the optimistic concurrency expectation.
    let records = build_records::<A>(state.id(), *version, &events)?;
    let options = if *version == Version::initial() {
        AppendOptions::expect_new()
    } else {
        AppendOptions::expect_version(*version)
    };
    let new_version = store.append(records, options).await?;

    // 5. Fold the acknowledged events into a new state, in emission
    //    order. State advances only after this fold succeeds in full.
    let next = behavior.fold(state.clone(), &events)?;
    *state = next;
    *version = new_version;

    metrics::counter!("aggregate_events_applied_total").increment(events.len() as u64);
    tracing::debug!(
        aggregate_type = A::AGGREGATE_TYPE,
        aggregate_id = %state.id(),
        count = events.len(),
        version = %new_version,
        "events appended and applied"
    );

    Ok(Dispatched {
        events,
        state: state.clone(),
        version: new_version,
    })
}

/// Builds durable records from domain events, assigning sequential
/// versions after `current_version`.
fn build_records<A: AggregateBehavior>(
    aggregate_id: AggregateId,
    current_version: Version,
    events: &[A::Event],
) -> Result<Vec<EventRecord>, DispatchError<A::Rejection>> {
    let mut records = Vec::with_capacity(events.len());
    let mut version = current_version;

    for event in events {
        version = version.next();
        let record = EventRecord::builder()
            .aggregate_id(aggregate_id)
            .aggregate_type(A::AGGREGATE_TYPE)
            .event_type(event.event_type())
            .version(version)
            .payload(event)?
            .build();
        records.push(record);
    }

    Ok(records)
}
