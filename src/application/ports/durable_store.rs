use crate::domain::entities::{
    EntityMirror, PendingOperation, PendingOperationDraft, PendingOperationPatch, RawAction,
    RawActionDraft, RawActionPatch, SyncMetadataRecord,
};
use crate::domain::value_objects::{EntityKind, PendingOperationId, RawActionId};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Versioned, transactional local storage shared by every component.
#[async_trait]
pub trait DurableStore: Send + Sync {
    // entity mirrors
    async fn get_mirror(
        &self,
        kind: &EntityKind,
        id: &str,
    ) -> Result<Option<EntityMirror>, AppError>;
    async fn put_mirror(&self, mirror: &EntityMirror) -> Result<(), AppError>;
    async fn delete_mirror(&self, kind: &EntityKind, id: &str) -> Result<bool, AppError>;
    /// Live mirrors only; soft-deleted rows are excluded.
    async fn list_mirrors(&self, kind: &EntityKind) -> Result<Vec<EntityMirror>, AppError>;
    async fn purge_deleted_mirrors(&self, before: DateTime<Utc>) -> Result<u64, AppError>;

    // pending operations
    async fn enqueue_pending_operation(
        &self,
        draft: PendingOperationDraft,
    ) -> Result<PendingOperation, AppError>;
    /// Ordered by `(timestamp, id)` ascending.
    async fn list_pending_operations(&self) -> Result<Vec<PendingOperation>, AppError>;
    async fn get_pending_operation(
        &self,
        id: PendingOperationId,
    ) -> Result<Option<PendingOperation>, AppError>;
    async fn update_pending_operation(
        &self,
        id: PendingOperationId,
        patch: PendingOperationPatch,
    ) -> Result<(), AppError>;
    async fn delete_pending_operation(&self, id: PendingOperationId) -> Result<bool, AppError>;
    async fn count_pending_operations(&self) -> Result<u64, AppError>;

    // sync metadata
    async fn read_sync_metadata(&self, key: &str) -> Result<Option<SyncMetadataRecord>, AppError>;
    async fn write_sync_metadata(&self, record: &SyncMetadataRecord) -> Result<(), AppError>;
    async fn list_sync_metadata(&self) -> Result<Vec<SyncMetadataRecord>, AppError>;

    // connectivity flags
    async fn read_flag(&self, key: &str) -> Result<Option<bool>, AppError>;
    async fn write_flag(&self, key: &str, value: bool) -> Result<(), AppError>;

    // raw actions
    async fn enqueue_raw_action(&self, draft: RawActionDraft) -> Result<RawAction, AppError>;
    /// Stores the whole batch in one transaction. A draft with an explicit
    /// timestamp that matches a stored row on url, method and timestamp is
    /// skipped. Returns the actions actually inserted.
    async fn enqueue_raw_actions(
        &self,
        drafts: Vec<RawActionDraft>,
    ) -> Result<Vec<RawAction>, AppError>;
    async fn list_raw_actions(&self) -> Result<Vec<RawAction>, AppError>;
    async fn get_raw_action(&self, id: RawActionId) -> Result<Option<RawAction>, AppError>;
    async fn update_raw_action(
        &self,
        id: RawActionId,
        patch: RawActionPatch,
    ) -> Result<(), AppError>;
    async fn delete_raw_action(&self, id: RawActionId) -> Result<bool, AppError>;
    async fn count_raw_actions(&self) -> Result<u64, AppError>;

    // drain leases
    /// Returns `true` when `holder` now owns the lease, either freshly or by
    /// renewing its own unexpired one.
    async fn try_acquire_lease(
        &self,
        name: &str,
        holder: &str,
        ttl: Duration,
    ) -> Result<bool, AppError>;
    async fn release_lease(&self, name: &str, holder: &str) -> Result<(), AppError>;
}
