use crate::domain::value_objects::{
    EntityKind, IdempotencyKey, OperationType, PendingOperationId, RetryState,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A durably queued intention to mutate one remote entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PendingOperation {
    pub id: PendingOperationId,
    #[serde(rename = "type")]
    pub operation_type: OperationType,
    pub entity: EntityKind,
    pub entity_id: Option<String>,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
    pub retries: u32,
    pub error: Option<String>,
    pub retry_state: RetryState,
    pub idempotency_key: IdempotencyKey,
}

/// What the caller hands to the store; id, idempotency key and (by default)
/// timestamp are assigned on enqueue.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingOperationDraft {
    pub operation_type: OperationType,
    pub entity: EntityKind,
    pub entity_id: Option<String>,
    pub data: Value,
    pub timestamp: Option<DateTime<Utc>>,
}

impl PendingOperationDraft {
    pub fn new(
        operation_type: OperationType,
        entity: EntityKind,
        entity_id: Option<String>,
        data: Value,
    ) -> Self {
        Self {
            operation_type,
            entity,
            entity_id,
            data,
            timestamp: None,
        }
    }

    pub fn create(entity: EntityKind, data: Value) -> Self {
        Self::new(OperationType::Create, entity, None, data)
    }

    pub fn update(entity: EntityKind, entity_id: impl Into<String>, data: Value) -> Self {
        Self::new(OperationType::Update, entity, Some(entity_id.into()), data)
    }

    pub fn delete(entity: EntityKind, entity_id: impl Into<String>) -> Self {
        Self::new(
            OperationType::Delete,
            entity,
            Some(entity_id.into()),
            Value::Object(Default::default()),
        )
    }

    /// Pins the FIFO position instead of using the enqueue time.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingOperationPatch {
    pub retries: Option<u32>,
    pub error: Option<Option<String>>,
    pub retry_state: Option<RetryState>,
}

impl PendingOperationPatch {
    pub fn failure(retries: u32, error: String, retry_state: RetryState) -> Self {
        Self {
            retries: Some(retries),
            error: Some(Some(error)),
            retry_state: Some(retry_state),
        }
    }

    pub fn requeue() -> Self {
        Self {
            retries: None,
            error: None,
            retry_state: Some(RetryState::Pending),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.retries.is_none() && self.error.is_none() && self.retry_state.is_none()
    }
}
