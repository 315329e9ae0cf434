//! Serialized replay of the pending-operation queue against the remote
//! service.

mod handlers;
mod status;

pub use handlers::HandlerRegistry;
pub use status::{StatusListener, SyncStatusEvent, SyncSubscription};

use super::offline_queues::PendingOperationQueue;
use super::retry_policy::RetryPolicy;
use crate::application::ports::{DurableStore, OfflineQueue, SyncNotifier};
use crate::domain::entities::{DrainReport, EntityMirror, PendingOperation, SyncMetadataRecord};
use crate::domain::value_objects::{EntityKind, OperationType, PendingOperationId, SyncState};
use crate::shared::config::SyncConfig;
use crate::shared::error::{AppError, OperationError};
use chrono::{DateTime, Utc};
use serde_json::Value;
use status::ListenerRegistry;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const DRAIN_LEASE_NAME: &str = "pending_operations";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    Completed(DrainReport),
    /// Another drain is in flight in this engine; nothing was done.
    AlreadyRunning,
    /// Another context sharing the store holds the drain lease.
    LeaseUnavailable,
}

impl DrainOutcome {
    pub fn report(&self) -> Option<&DrainReport> {
        match self {
            DrainOutcome::Completed(report) => Some(report),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, DrainOutcome::Completed(_))
    }
}

#[derive(Debug, Clone)]
pub struct SyncEngineSettings {
    pub retry_policy: RetryPolicy,
    pub advisory_retry_threshold: u32,
    /// `None` disables cross-context leader election.
    pub lease_ttl: Option<Duration>,
}

impl SyncEngineSettings {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            retry_policy: RetryPolicy::from_config(config),
            advisory_retry_threshold: config.advisory_retry_threshold,
            lease_ttl: config
                .use_drain_lease
                .then(|| Duration::from_secs(config.lease_ttl_secs)),
        }
    }
}

impl Default for SyncEngineSettings {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}

/// Clears the in-flight flag when the drain ends, including by panic.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Default)]
struct PassTally {
    succeeded: usize,
    failed: usize,
    skipped: usize,
    interrupted: bool,
}

pub struct SyncEngine {
    store: Arc<dyn DurableStore>,
    queue: PendingOperationQueue,
    handlers: HandlerRegistry,
    notifier: Arc<dyn SyncNotifier>,
    listeners: Arc<ListenerRegistry>,
    in_flight: AtomicBool,
    advisory_retry_threshold: u32,
    lease_ttl: Option<Duration>,
    holder_id: String,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn DurableStore>,
        handlers: HandlerRegistry,
        notifier: Arc<dyn SyncNotifier>,
        settings: SyncEngineSettings,
    ) -> Self {
        let queue = PendingOperationQueue::new(Arc::clone(&store), settings.retry_policy);
        Self {
            store,
            queue,
            handlers,
            notifier,
            listeners: Arc::new(ListenerRegistry::default()),
            in_flight: AtomicBool::new(false),
            advisory_retry_threshold: settings.advisory_retry_threshold.max(1),
            lease_ttl: settings.lease_ttl,
            holder_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn queue(&self) -> &PendingOperationQueue {
        &self.queue
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    pub fn is_syncing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn get_pending_count(&self) -> Result<u64, AppError> {
        self.queue.len().await
    }

    pub fn on_sync_status_change<F>(&self, listener: F) -> SyncSubscription
    where
        F: Fn(&SyncStatusEvent) + Send + Sync + 'static,
    {
        self.listeners.subscribe(Arc::new(listener))
    }

    pub async fn requeue_operation(&self, id: PendingOperationId) -> Result<(), AppError> {
        self.queue.requeue(id).await
    }

    pub async fn discard_operation(&self, id: PendingOperationId) -> Result<bool, AppError> {
        self.queue.discard(id).await
    }

    pub async fn dead_lettered_operations(&self) -> Result<Vec<PendingOperation>, AppError> {
        self.queue.dead_lettered().await
    }

    /// Runs one drain pass unless one is already running here or in another
    /// context sharing the store.
    pub async fn process_pending_operations(&self) -> Result<DrainOutcome, AppError> {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            debug!(target: "offline::sync", "drain already running, skipping");
            return Ok(DrainOutcome::AlreadyRunning);
        };

        if let Some(ttl) = self.lease_ttl
            && !self
                .store
                .try_acquire_lease(DRAIN_LEASE_NAME, &self.holder_id, ttl)
                .await?
        {
            debug!(target: "offline::sync", "drain lease held elsewhere, skipping");
            return Ok(DrainOutcome::LeaseUnavailable);
        }

        let result = self.drain_pass().await;

        if self.lease_ttl.is_some()
            && let Err(err) = self
                .store
                .release_lease(DRAIN_LEASE_NAME, &self.holder_id)
                .await
        {
            warn!(target: "offline::sync", error = %err, "failed to release drain lease");
        }

        result.map(DrainOutcome::Completed)
    }

    async fn drain_pass(&self) -> Result<DrainReport, AppError> {
        let started_at = Utc::now();
        let snapshot = match self.queue.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                let kinds = self.metadata_kinds(&[]);
                self.emit(SyncState::Syncing, None).await;
                self.finish_with_error(&kinds, &err).await;
                return Err(err);
            }
        };
        let kinds = self.metadata_kinds(&snapshot);

        info!(
            target: "offline::sync",
            queued = snapshot.len(),
            "drain started"
        );
        if let Err(err) = self
            .write_metadata(&kinds, SyncState::Syncing, started_at)
            .await
        {
            self.emit(SyncState::Syncing, Some(snapshot.len() as u64))
                .await;
            self.finish_with_error(&kinds, &err).await;
            return Err(err);
        }
        self.emit(SyncState::Syncing, Some(snapshot.len() as u64))
            .await;

        let tally = match self.replay_snapshot(snapshot).await {
            Ok(tally) => tally,
            Err(err) => {
                self.finish_with_error(&kinds, &err).await;
                return Err(err);
            }
        };

        let remaining = match self.queue.len().await {
            Ok(remaining) => remaining,
            Err(err) => {
                self.finish_with_error(&kinds, &err).await;
                return Err(err);
            }
        };
        let finished_at = Utc::now();
        let report = DrainReport {
            started_at,
            finished_at,
            succeeded: tally.succeeded,
            failed: tally.failed,
            skipped: tally.skipped,
            interrupted: tally.interrupted,
            remaining,
        };
        let terminal = if report.has_failures() || report.interrupted {
            SyncState::Error
        } else {
            SyncState::Idle
        };

        if let Err(err) = self.write_metadata(&kinds, terminal, finished_at).await {
            warn!(target: "offline::sync", error = %err, "failed to record sync metadata");
        }
        self.listeners.emit(&SyncStatusEvent {
            status: terminal,
            pending_count: Some(remaining),
            at: finished_at,
            report: Some(report.clone()),
        });

        info!(
            target: "offline::sync",
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            interrupted = report.interrupted,
            remaining = report.remaining,
            "drain finished"
        );

        if remaining == 0 {
            self.notifier.sync_completed(&report).await;
        }
        Ok(report)
    }

    /// Applies the snapshot in order. Individual failures are recorded and
    /// never stop the pass; only store failures while bookkeeping do.
    async fn replay_snapshot(&self, snapshot: Vec<PendingOperation>) -> Result<PassTally, AppError> {
        let mut tally = PassTally::default();

        for operation in snapshot {
            let now = Utc::now();
            if !operation.retry_state.is_ready(now) {
                debug!(
                    target: "offline::sync",
                    id = operation.id.value(),
                    state = operation.retry_state.label(),
                    "operation not eligible, skipping"
                );
                tally.skipped += 1;
                continue;
            }

            if !self.renew_lease().await? {
                warn!(
                    target: "offline::sync",
                    id = operation.id.value(),
                    "drain lease lost to another context, stopping pass"
                );
                tally.interrupted = true;
                break;
            }

            match self.execute(&operation).await {
                Ok(()) => {
                    self.queue.ack(operation.id).await?;
                    tally.succeeded += 1;
                    debug!(
                        target: "offline::sync",
                        id = operation.id.value(),
                        entity = operation.entity.as_str(),
                        operation = operation.operation_type.as_str(),
                        "operation replayed"
                    );
                }
                Err(err) => {
                    tally.failed += 1;
                    let outcome = self
                        .queue
                        .fail(&operation, &err.to_string(), Utc::now())
                        .await?;
                    warn!(
                        target: "offline::sync",
                        id = operation.id.value(),
                        entity = operation.entity.as_str(),
                        operation = operation.operation_type.as_str(),
                        retries = outcome.retries,
                        state = outcome.retry_state.label(),
                        error = %err,
                        "operation replay failed"
                    );

                    if outcome.retries >= self.advisory_retry_threshold {
                        let failing = PendingOperation {
                            retries: outcome.retries,
                            error: Some(err.to_string()),
                            retry_state: outcome.retry_state,
                            ..operation
                        };
                        self.notifier.operation_failing(&failing, &err).await;
                    }
                }
            }
        }

        Ok(tally)
    }

    async fn execute(&self, operation: &PendingOperation) -> Result<(), OperationError> {
        let handler = self.handlers.get(&operation.entity).ok_or_else(|| {
            OperationError::UnknownOperation(format!(
                "no handler registered for entity '{}'",
                operation.entity
            ))
        })?;
        let key = &operation.idempotency_key;

        match &operation.operation_type {
            OperationType::Create => {
                let response = handler.create(&operation.data, key).await?;
                let mirror = mirror_from_response(&operation.entity, None, &response)?;
                self.store.put_mirror(&mirror).await?;
            }
            OperationType::Update => {
                let id = require_entity_id(operation)?;
                let response = handler.update(id, &operation.data, key).await?;
                let mirror = mirror_from_response(&operation.entity, Some(id), &response)?;
                self.store.put_mirror(&mirror).await?;
            }
            OperationType::Delete => {
                let id = require_entity_id(operation)?;
                handler.delete(id, key).await?;
                if let Some(mut mirror) = self.store.get_mirror(&operation.entity, id).await? {
                    mirror.mark_deleted(Utc::now());
                    self.store.put_mirror(&mirror).await?;
                }
            }
            OperationType::Unknown(kind) => {
                return Err(OperationError::UnknownOperation(format!(
                    "unsupported operation type '{kind}'"
                )));
            }
        }
        Ok(())
    }

    /// Registered kinds plus every kind present in the snapshot.
    fn metadata_kinds(&self, snapshot: &[PendingOperation]) -> Vec<EntityKind> {
        let mut keys: BTreeSet<String> = self
            .handlers
            .kinds()
            .iter()
            .map(|kind| kind.as_str().to_string())
            .collect();
        keys.extend(snapshot.iter().map(|op| op.entity.as_str().to_string()));
        keys.into_iter().map(EntityKind::from).collect()
    }

    async fn write_metadata(
        &self,
        kinds: &[EntityKind],
        status: SyncState,
        at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        for kind in kinds {
            self.store
                .write_sync_metadata(&SyncMetadataRecord::new(kind.as_str(), status, at))
                .await?;
        }
        Ok(())
    }

    async fn finish_with_error(&self, kinds: &[EntityKind], err: &AppError) {
        error!(target: "offline::sync", error = %err, "drain aborted by store failure");
        if let Err(meta_err) = self.write_metadata(kinds, SyncState::Error, Utc::now()).await {
            warn!(target: "offline::sync", error = %meta_err, "failed to record sync metadata");
        }
        self.emit(SyncState::Error, None).await;
    }

    /// Broadcasts `status`; the pending count is read from the store when not
    /// already known.
    async fn emit(&self, status: SyncState, pending_count: Option<u64>) {
        let pending_count = match pending_count {
            Some(count) => Some(count),
            None => match self.queue.len().await {
                Ok(count) => Some(count),
                Err(err) => {
                    debug!(target: "offline::sync", error = %err, "pending count unavailable");
                    None
                }
            },
        };
        self.listeners.emit(&SyncStatusEvent {
            status,
            pending_count,
            at: Utc::now(),
            report: None,
        });
    }

    /// Extends our drain lease. `false` means another context took it over
    /// after it expired.
    async fn renew_lease(&self) -> Result<bool, AppError> {
        match self.lease_ttl {
            Some(ttl) => {
                self.store
                    .try_acquire_lease(DRAIN_LEASE_NAME, &self.holder_id, ttl)
                    .await
            }
            None => Ok(true),
        }
    }
}

fn require_entity_id(operation: &PendingOperation) -> Result<&str, OperationError> {
    operation
        .entity_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| {
            OperationError::InvalidOperation(format!(
                "{} on {} requires an entity id",
                operation.operation_type, operation.entity
            ))
        })
}

fn mirror_from_response(
    kind: &EntityKind,
    fallback_id: Option<&str>,
    response: &Value,
) -> Result<EntityMirror, OperationError> {
    match (EntityMirror::from_server(kind.clone(), response), fallback_id) {
        (Ok(mirror), _) => Ok(mirror),
        (Err(_), Some(id)) if response.is_object() => {
            Ok(EntityMirror::new(kind.clone(), id, response.clone()))
        }
        (Err(reason), _) => Err(OperationError::InvalidResponse(reason)),
    }
}
