use super::connection_pool::DbPool;
use super::mappers::{
    entity_mirror_from_row, pending_operation_from_row, raw_action_from_row,
    sync_metadata_from_row,
};
use super::reset::DeveloperReset;
use super::rows::{EntityMirrorRow, PendingOperationRow, RawActionRow, SyncMetadataRow};
use crate::application::ports::DurableStore;
use crate::domain::entities::{
    EntityMirror, PendingOperation, PendingOperationDraft, PendingOperationPatch, RawAction,
    RawActionDraft, RawActionPatch, SyncMetadataRecord,
};
use crate::domain::value_objects::{EntityKind, IdempotencyKey, PendingOperationId, RawActionId};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, warn};

const PENDING_COLUMNS: &str = "id, operation_type, entity, entity_id, data, timestamp, retries, \
     error, retry_state, next_attempt_at, dead_letter_reason, idempotency_key";
const RAW_ACTION_COLUMNS: &str = "id, url, method, headers, body, timestamp, retries, error, \
     retry_state, next_attempt_at, dead_letter_reason";

/// SQLite-backed [`DurableStore`].
#[derive(Clone)]
pub struct SqliteDurableStore {
    pool: DbPool,
}

impl SqliteDurableStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Deletes every row of every table. The schema itself is kept.
    pub async fn reset_destructively(&self, _token: DeveloperReset) -> Result<(), AppError> {
        warn!(target: "offline::store", "destructive reset of the local store requested");
        let mut tx = self.pool.begin().await?;
        for table in [
            "entity_mirrors",
            "pending_operations",
            "sync_metadata",
            "connectivity_flags",
            "raw_actions",
            "drain_leases",
        ] {
            sqlx::query(&format!("DELETE FROM {table}"))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl DurableStore for SqliteDurableStore {
    async fn get_mirror(
        &self,
        kind: &EntityKind,
        id: &str,
    ) -> Result<Option<EntityMirror>, AppError> {
        let row = sqlx::query_as::<_, EntityMirrorRow>(
            r#"
            SELECT kind, id, data, status, created_at, updated_at, deleted_at
            FROM entity_mirrors
            WHERE kind = ?1 AND id = ?2
            "#,
        )
        .bind(kind.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(entity_mirror_from_row).transpose()
    }

    async fn put_mirror(&self, mirror: &EntityMirror) -> Result<(), AppError> {
        let data = serde_json::to_string(&mirror.data)?;
        sqlx::query(
            r#"
            INSERT INTO entity_mirrors (kind, id, data, status, created_at, updated_at, deleted_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(kind, id) DO UPDATE SET
                data = excluded.data,
                status = excluded.status,
                created_at = COALESCE(entity_mirrors.created_at, excluded.created_at),
                updated_at = excluded.updated_at,
                deleted_at = excluded.deleted_at
            "#,
        )
        .bind(mirror.kind.as_str())
        .bind(&mirror.id)
        .bind(&data)
        .bind(&mirror.status)
        .bind(mirror.created_at.map(|at| at.timestamp_millis()))
        .bind(mirror.updated_at.timestamp_millis())
        .bind(mirror.deleted_at.map(|at| at.timestamp_millis()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_mirror(&self, kind: &EntityKind, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM entity_mirrors WHERE kind = ?1 AND id = ?2")
            .bind(kind.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_mirrors(&self, kind: &EntityKind) -> Result<Vec<EntityMirror>, AppError> {
        let rows = sqlx::query_as::<_, EntityMirrorRow>(
            r#"
            SELECT kind, id, data, status, created_at, updated_at, deleted_at
            FROM entity_mirrors
            WHERE kind = ?1 AND deleted_at IS NULL
            ORDER BY id ASC
            "#,
        )
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(entity_mirror_from_row).collect()
    }

    async fn purge_deleted_mirrors(&self, before: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query(
            "DELETE FROM entity_mirrors WHERE deleted_at IS NOT NULL AND deleted_at < ?1",
        )
        .bind(before.timestamp_millis())
        .execute(&self.pool)
        .await?;
        let purged = result.rows_affected();
        if purged > 0 {
            debug!(target: "offline::store", purged, "purged soft-deleted mirrors");
        }
        Ok(purged)
    }

    async fn enqueue_pending_operation(
        &self,
        draft: PendingOperationDraft,
    ) -> Result<PendingOperation, AppError> {
        let data = serde_json::to_string(&draft.data)?;
        let timestamp = draft.timestamp.unwrap_or_else(Utc::now);
        let key = IdempotencyKey::generate();

        let result = sqlx::query(
            r#"
            INSERT INTO pending_operations (
                operation_type, entity, entity_id, data, timestamp,
                retries, retry_state, idempotency_key
            ) VALUES (?1, ?2, ?3, ?4, ?5, 0, 'pending', ?6)
            "#,
        )
        .bind(draft.operation_type.as_str())
        .bind(draft.entity.as_str())
        .bind(&draft.entity_id)
        .bind(&data)
        .bind(timestamp.timestamp_millis())
        .bind(key.as_str())
        .execute(&self.pool)
        .await?;

        let id = PendingOperationId::new(result.last_insert_rowid())
            .map_err(AppError::Internal)?;
        debug!(
            target: "offline::store",
            id = id.value(),
            entity = draft.entity.as_str(),
            operation = draft.operation_type.as_str(),
            "pending operation enqueued"
        );
        self.get_pending_operation(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Pending operation {id}")))
    }

    async fn list_pending_operations(&self) -> Result<Vec<PendingOperation>, AppError> {
        let rows = sqlx::query_as::<_, PendingOperationRow>(&format!(
            "SELECT {PENDING_COLUMNS} FROM pending_operations ORDER BY timestamp ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(pending_operation_from_row).collect()
    }

    async fn get_pending_operation(
        &self,
        id: PendingOperationId,
    ) -> Result<Option<PendingOperation>, AppError> {
        let row = sqlx::query_as::<_, PendingOperationRow>(&format!(
            "SELECT {PENDING_COLUMNS} FROM pending_operations WHERE id = ?1"
        ))
        .bind(id.value())
        .fetch_optional(&self.pool)
        .await?;

        row.map(pending_operation_from_row).transpose()
    }

    async fn update_pending_operation(
        &self,
        id: PendingOperationId,
        patch: PendingOperationPatch,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, PendingOperationRow>(&format!(
            "SELECT {PENDING_COLUMNS} FROM pending_operations WHERE id = ?1"
        ))
        .bind(id.value())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Pending operation {id}")))?;
        let current = pending_operation_from_row(row)?;

        let retries = patch.retries.unwrap_or(current.retries);
        let error = patch.error.unwrap_or(current.error);
        let retry_state = patch.retry_state.unwrap_or(current.retry_state);
        let (state, next_attempt_at, reason) = retry_state.to_columns();

        sqlx::query(
            r#"
            UPDATE pending_operations
            SET retries = ?1, error = ?2, retry_state = ?3,
                next_attempt_at = ?4, dead_letter_reason = ?5
            WHERE id = ?6
            "#,
        )
        .bind(i64::from(retries))
        .bind(&error)
        .bind(state)
        .bind(next_attempt_at)
        .bind(reason)
        .bind(id.value())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete_pending_operation(&self, id: PendingOperationId) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM pending_operations WHERE id = ?1")
            .bind(id.value())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_pending_operations(&self) -> Result<u64, AppError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pending_operations")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn read_sync_metadata(&self, key: &str) -> Result<Option<SyncMetadataRecord>, AppError> {
        let row = sqlx::query_as::<_, SyncMetadataRow>(
            "SELECT key, last_sync, status FROM sync_metadata WHERE key = ?1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(sync_metadata_from_row).transpose()
    }

    async fn write_sync_metadata(&self, record: &SyncMetadataRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO sync_metadata (key, last_sync, status)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                last_sync = excluded.last_sync,
                status = excluded.status
            "#,
        )
        .bind(&record.key)
        .bind(record.last_sync.map(|at| at.timestamp_millis()))
        .bind(record.status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_sync_metadata(&self) -> Result<Vec<SyncMetadataRecord>, AppError> {
        let rows = sqlx::query_as::<_, SyncMetadataRow>(
            "SELECT key, last_sync, status FROM sync_metadata ORDER BY key ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(sync_metadata_from_row).collect()
    }

    async fn read_flag(&self, key: &str) -> Result<Option<bool>, AppError> {
        let value: Option<(i64,)> =
            sqlx::query_as("SELECT value FROM connectivity_flags WHERE key = ?1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(value.map(|(v,)| v != 0))
    }

    async fn write_flag(&self, key: &str, value: bool) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO connectivity_flags (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(i64::from(value))
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn enqueue_raw_action(&self, draft: RawActionDraft) -> Result<RawAction, AppError> {
        let headers = serde_json::to_string(&draft.headers)?;
        let timestamp = draft.timestamp.unwrap_or_else(Utc::now);

        let result = sqlx::query(
            r#"
            INSERT INTO raw_actions (url, method, headers, body, timestamp, retries, retry_state)
            VALUES (?1, ?2, ?3, ?4, ?5, 0, 'pending')
            "#,
        )
        .bind(&draft.url)
        .bind(draft.method.to_ascii_uppercase())
        .bind(&headers)
        .bind(&draft.body)
        .bind(timestamp.timestamp_millis())
        .execute(&self.pool)
        .await?;

        let id = RawActionId::new(result.last_insert_rowid()).map_err(AppError::Internal)?;
        debug!(target: "offline::store", id = id.value(), url = %draft.url, "raw action enqueued");
        self.get_raw_action(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Raw action {id}")))
    }

    async fn enqueue_raw_actions(
        &self,
        drafts: Vec<RawActionDraft>,
    ) -> Result<Vec<RawAction>, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = Vec::with_capacity(drafts.len());
        let mut duplicates = 0usize;

        for draft in &drafts {
            let method = draft.method.to_ascii_uppercase();
            if let Some(timestamp) = draft.timestamp {
                let existing: Option<i64> = sqlx::query_scalar(
                    r#"
                    SELECT id FROM raw_actions
                    WHERE url = ?1 AND method = ?2 AND timestamp = ?3
                    LIMIT 1
                    "#,
                )
                .bind(&draft.url)
                .bind(&method)
                .bind(timestamp.timestamp_millis())
                .fetch_optional(&mut *tx)
                .await?;
                if existing.is_some() {
                    duplicates += 1;
                    continue;
                }
            }

            let headers = serde_json::to_string(&draft.headers)?;
            let timestamp = draft.timestamp.unwrap_or_else(Utc::now);
            let result = sqlx::query(
                r#"
                INSERT INTO raw_actions (url, method, headers, body, timestamp, retries, retry_state)
                VALUES (?1, ?2, ?3, ?4, ?5, 0, 'pending')
                "#,
            )
            .bind(&draft.url)
            .bind(&method)
            .bind(&headers)
            .bind(&draft.body)
            .bind(timestamp.timestamp_millis())
            .execute(&mut *tx)
            .await?;
            inserted.push(RawActionId::new(result.last_insert_rowid()).map_err(AppError::Internal)?);
        }
        tx.commit().await?;

        debug!(
            target: "offline::store",
            inserted = inserted.len(),
            duplicates,
            "raw action batch enqueued"
        );
        let mut actions = Vec::with_capacity(inserted.len());
        for id in inserted {
            let action = self
                .get_raw_action(id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Raw action {id}")))?;
            actions.push(action);
        }
        Ok(actions)
    }

    async fn list_raw_actions(&self) -> Result<Vec<RawAction>, AppError> {
        let rows = sqlx::query_as::<_, RawActionRow>(&format!(
            "SELECT {RAW_ACTION_COLUMNS} FROM raw_actions ORDER BY timestamp ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(raw_action_from_row).collect()
    }

    async fn get_raw_action(&self, id: RawActionId) -> Result<Option<RawAction>, AppError> {
        let row = sqlx::query_as::<_, RawActionRow>(&format!(
            "SELECT {RAW_ACTION_COLUMNS} FROM raw_actions WHERE id = ?1"
        ))
        .bind(id.value())
        .fetch_optional(&self.pool)
        .await?;

        row.map(raw_action_from_row).transpose()
    }

    async fn update_raw_action(
        &self,
        id: RawActionId,
        patch: RawActionPatch,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, RawActionRow>(&format!(
            "SELECT {RAW_ACTION_COLUMNS} FROM raw_actions WHERE id = ?1"
        ))
        .bind(id.value())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Raw action {id}")))?;
        let current = raw_action_from_row(row)?;

        let retries = patch.retries.unwrap_or(current.retries);
        let error = patch.error.unwrap_or(current.error);
        let retry_state = patch.retry_state.unwrap_or(current.retry_state);
        let (state, next_attempt_at, reason) = retry_state.to_columns();

        sqlx::query(
            r#"
            UPDATE raw_actions
            SET retries = ?1, error = ?2, retry_state = ?3,
                next_attempt_at = ?4, dead_letter_reason = ?5
            WHERE id = ?6
            "#,
        )
        .bind(i64::from(retries))
        .bind(&error)
        .bind(state)
        .bind(next_attempt_at)
        .bind(reason)
        .bind(id.value())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete_raw_action(&self, id: RawActionId) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM raw_actions WHERE id = ?1")
            .bind(id.value())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_raw_actions(&self) -> Result<u64, AppError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM raw_actions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn try_acquire_lease(
        &self,
        name: &str,
        holder: &str,
        ttl: Duration,
    ) -> Result<bool, AppError> {
        let now = Utc::now().timestamp_millis();
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at = now.saturating_add(ttl_ms);

        // The conditional upsert only overwrites an expired lease or our own.
        let result = sqlx::query(
            r#"
            INSERT INTO drain_leases (name, holder, expires_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(name) DO UPDATE SET
                holder = excluded.holder,
                expires_at = excluded.expires_at
            WHERE drain_leases.holder = excluded.holder OR drain_leases.expires_at <= ?4
            "#,
        )
        .bind(name)
        .bind(holder)
        .bind(expires_at)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn release_lease(&self, name: &str, holder: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM drain_leases WHERE name = ?1 AND holder = ?2")
            .bind(name)
            .bind(holder)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
