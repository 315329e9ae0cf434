use super::rows::{EntityMirrorRow, PendingOperationRow, RawActionRow, SyncMetadataRow};
use crate::domain::entities::{EntityMirror, PendingOperation, RawAction, SyncMetadataRecord};
use crate::domain::value_objects::{
    EntityKind, IdempotencyKey, OperationType, PendingOperationId, RawActionId, RetryState,
    SyncState,
};
use crate::shared::error::AppError;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::BTreeMap;

pub fn millis_to_datetime(millis: i64) -> Result<DateTime<Utc>, AppError> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| AppError::DeserializationError(format!("Invalid timestamp: {millis}")))
}

fn optional_millis(value: Option<i64>) -> Result<Option<DateTime<Utc>>, AppError> {
    value.map(millis_to_datetime).transpose()
}

fn retries_from_row(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

pub fn entity_mirror_from_row(row: EntityMirrorRow) -> Result<EntityMirror, AppError> {
    let data = serde_json::from_str(&row.data)
        .map_err(|e| AppError::DeserializationError(format!("Invalid mirror data: {e}")))?;
    Ok(EntityMirror {
        kind: EntityKind::from(row.kind),
        id: row.id,
        data,
        status: row.status,
        created_at: optional_millis(row.created_at)?,
        updated_at: millis_to_datetime(row.updated_at)?,
        deleted_at: optional_millis(row.deleted_at)?,
    })
}

pub fn pending_operation_from_row(row: PendingOperationRow) -> Result<PendingOperation, AppError> {
    let data = serde_json::from_str(&row.data)
        .map_err(|e| AppError::DeserializationError(format!("Invalid operation data: {e}")))?;
    let retry_state =
        RetryState::from_columns(&row.retry_state, row.next_attempt_at, row.dead_letter_reason)
            .map_err(AppError::DeserializationError)?;
    // Rows written before idempotency keys existed are backfilled by migration;
    // a missing key is still tolerated by deriving one from the row id.
    let idempotency_key = match row.idempotency_key {
        Some(key) => IdempotencyKey::new(key).map_err(AppError::DeserializationError)?,
        None => IdempotencyKey::new(format!("pending-operation-{}", row.id))
            .map_err(AppError::DeserializationError)?,
    };

    Ok(PendingOperation {
        id: PendingOperationId::new(row.id).map_err(AppError::DeserializationError)?,
        operation_type: OperationType::from(row.operation_type),
        entity: EntityKind::from(row.entity),
        entity_id: row.entity_id,
        data,
        timestamp: millis_to_datetime(row.timestamp)?,
        retries: retries_from_row(row.retries),
        error: row.error,
        retry_state,
        idempotency_key,
    })
}

pub fn sync_metadata_from_row(row: SyncMetadataRow) -> Result<SyncMetadataRecord, AppError> {
    Ok(SyncMetadataRecord {
        key: row.key,
        last_sync: optional_millis(row.last_sync)?,
        status: SyncState::from(row.status.as_str()),
    })
}

pub fn raw_action_from_row(row: RawActionRow) -> Result<RawAction, AppError> {
    let headers: BTreeMap<String, String> = serde_json::from_str(&row.headers)
        .map_err(|e| AppError::DeserializationError(format!("Invalid headers: {e}")))?;
    let retry_state =
        RetryState::from_columns(&row.retry_state, row.next_attempt_at, row.dead_letter_reason)
            .map_err(AppError::DeserializationError)?;

    Ok(RawAction {
        id: RawActionId::new(row.id).map_err(AppError::DeserializationError)?,
        url: row.url,
        method: row.method,
        headers,
        body: row.body,
        timestamp: millis_to_datetime(row.timestamp)?,
        retries: retries_from_row(row.retries),
        error: row.error,
        retry_state,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_row() -> PendingOperationRow {
        PendingOperationRow {
            id: 7,
            operation_type: "UPDATE".to_string(),
            entity: "client".to_string(),
            entity_id: Some("c-1".to_string()),
            data: r#"{"name":"Ada"}"#.to_string(),
            timestamp: 1_700_000_000_000,
            retries: 2,
            error: Some("HTTP 500".to_string()),
            retry_state: "retrying".to_string(),
            next_attempt_at: Some(1_700_000_004_000),
            dead_letter_reason: None,
            idempotency_key: Some("key-7".to_string()),
        }
    }

    #[test]
    fn pending_operation_row_maps_to_domain() {
        let op = pending_operation_from_row(pending_row()).unwrap();
        assert_eq!(op.id.value(), 7);
        assert_eq!(op.operation_type, OperationType::Update);
        assert_eq!(op.entity, EntityKind::Client);
        assert_eq!(op.retries, 2);
        assert_eq!(op.idempotency_key.as_str(), "key-7");
        assert!(matches!(op.retry_state, RetryState::Retrying { .. }));
    }

    #[test]
    fn unknown_kinds_decode_instead_of_failing() {
        let mut row = pending_row();
        row.entity = "warehouse".to_string();
        row.operation_type = "MERGE".to_string();
        let op = pending_operation_from_row(row).unwrap();
        assert_eq!(op.entity, EntityKind::Unknown("warehouse".to_string()));
        assert_eq!(op.operation_type, OperationType::Unknown("MERGE".to_string()));
    }

    #[test]
    fn corrupt_payload_is_a_deserialization_error() {
        let mut row = pending_row();
        row.data = "{not json".to_string();
        assert!(matches!(
            pending_operation_from_row(row),
            Err(AppError::DeserializationError(_))
        ));
    }
}
