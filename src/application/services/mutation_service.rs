use super::connectivity_monitor::ConnectivityMonitor;
use super::sync_engine::SyncEngine;
use crate::application::ports::{DurableStore, OfflineQueue};
use crate::domain::entities::{EntityMirror, PendingOperation, PendingOperationDraft};
use crate::domain::value_objects::{EntityKind, IdempotencyKey, OperationType};
use crate::shared::error::OperationError;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome {
    /// The remote service accepted the mutation; carries the refreshed
    /// mirror (soft-deleted for deletes, when one existed).
    Applied(Option<EntityMirror>),
    /// The device is offline or the service unreachable; the mutation was
    /// queued for the next drain.
    Queued(PendingOperation),
}

impl MutationOutcome {
    pub fn is_queued(&self) -> bool {
        matches!(self, MutationOutcome::Queued(_))
    }
}

/// Entry point for UI mutations: try the remote service first and fall back
/// to the durable queue when it cannot be reached.
pub struct MutationService {
    store: Arc<dyn DurableStore>,
    engine: Arc<SyncEngine>,
    monitor: Arc<ConnectivityMonitor>,
}

impl MutationService {
    pub fn new(
        store: Arc<dyn DurableStore>,
        engine: Arc<SyncEngine>,
        monitor: Arc<ConnectivityMonitor>,
    ) -> Self {
        Self {
            store,
            engine,
            monitor,
        }
    }

    pub async fn create(
        &self,
        kind: EntityKind,
        data: Value,
    ) -> Result<MutationOutcome, OperationError> {
        self.mutate(PendingOperationDraft::create(kind, data)).await
    }

    pub async fn update(
        &self,
        kind: EntityKind,
        id: impl Into<String>,
        data: Value,
    ) -> Result<MutationOutcome, OperationError> {
        self.mutate(PendingOperationDraft::update(kind, id, data))
            .await
    }

    pub async fn delete(
        &self,
        kind: EntityKind,
        id: impl Into<String>,
    ) -> Result<MutationOutcome, OperationError> {
        self.mutate(PendingOperationDraft::delete(kind, id)).await
    }

    async fn mutate(&self, draft: PendingOperationDraft) -> Result<MutationOutcome, OperationError> {
        if !self.monitor.is_online() {
            debug!(target: "offline::sync", entity = draft.entity.as_str(), "offline, queueing mutation");
            return self.enqueue(draft).await;
        }

        match self.apply_remote(&draft).await {
            Ok(mirror) => Ok(MutationOutcome::Applied(mirror)),
            Err(err) if err.is_unreachable() => {
                warn!(
                    target: "offline::sync",
                    entity = draft.entity.as_str(),
                    error = %err,
                    "remote service unreachable, queueing mutation"
                );
                self.enqueue(draft).await
            }
            Err(err) => Err(err),
        }
    }

    async fn apply_remote(
        &self,
        draft: &PendingOperationDraft,
    ) -> Result<Option<EntityMirror>, OperationError> {
        let handler = self.engine.handlers().get(&draft.entity).ok_or_else(|| {
            OperationError::UnknownOperation(format!(
                "no handler registered for entity '{}'",
                draft.entity
            ))
        })?;
        let key = IdempotencyKey::generate();
        let entity_id = draft.entity_id.as_deref();

        match (&draft.operation_type, entity_id) {
            (OperationType::Create, _) => {
                let response = handler.create(&draft.data, &key).await?;
                let mirror = EntityMirror::from_server(draft.entity.clone(), &response)
                    .map_err(OperationError::InvalidResponse)?;
                self.store.put_mirror(&mirror).await?;
                Ok(Some(mirror))
            }
            (OperationType::Update, Some(id)) => {
                let response = handler.update(id, &draft.data, &key).await?;
                let mirror = EntityMirror::from_server(draft.entity.clone(), &response)
                    .unwrap_or_else(|_| EntityMirror::new(draft.entity.clone(), id, response));
                self.store.put_mirror(&mirror).await?;
                Ok(Some(mirror))
            }
            (OperationType::Delete, Some(id)) => {
                handler.delete(id, &key).await?;
                let Some(mut mirror) = self.store.get_mirror(&draft.entity, id).await? else {
                    return Ok(None);
                };
                mirror.mark_deleted(Utc::now());
                self.store.put_mirror(&mirror).await?;
                Ok(Some(mirror))
            }
            (OperationType::Update | OperationType::Delete, None) => {
                Err(OperationError::InvalidOperation(format!(
                    "{} on {} requires an entity id",
                    draft.operation_type, draft.entity
                )))
            }
            (OperationType::Unknown(kind), _) => Err(OperationError::UnknownOperation(format!(
                "unsupported operation type '{kind}'"
            ))),
        }
    }

    async fn enqueue(&self, draft: PendingOperationDraft) -> Result<MutationOutcome, OperationError> {
        if draft.operation_type == OperationType::Update
            && let Some(id) = draft.entity_id.as_deref()
        {
            self.write_optimistic_mirror(&draft.entity, id, &draft.data)
                .await?;
        }

        let operation = self.engine.queue().enqueue(draft).await?;
        info!(
            target: "offline::sync",
            id = operation.id.value(),
            entity = operation.entity.as_str(),
            operation = operation.operation_type.as_str(),
            "mutation queued for later sync"
        );
        self.monitor.refresh_pending_count().await?;
        Ok(MutationOutcome::Queued(operation))
    }

    async fn write_optimistic_mirror(
        &self,
        kind: &EntityKind,
        id: &str,
        patch: &Value,
    ) -> Result<(), OperationError> {
        let mirror = match self.store.get_mirror(kind, id).await? {
            Some(mut existing) => {
                existing.apply_patch(patch);
                existing
            }
            None => {
                let mut data = patch.clone();
                if let Some(object) = data.as_object_mut() {
                    object
                        .entry("id")
                        .or_insert_with(|| Value::String(id.to_string()));
                }
                EntityMirror::new(kind.clone(), id, data)
            }
        };
        self.store.put_mirror(&mirror).await?;
        Ok(())
    }
}
