use crate::domain::value_objects::{EntityKind, IdempotencyKey};
use crate::shared::error::OperationError;
use async_trait::async_trait;
use serde_json::Value;

/// Remote CRUD contract for one entity kind. Successful create and update
/// calls return the server-authoritative representation.
#[async_trait]
pub trait EntityHandler: Send + Sync {
    fn kind(&self) -> EntityKind;

    async fn create(&self, data: &Value, key: &IdempotencyKey) -> Result<Value, OperationError>;

    async fn update(
        &self,
        id: &str,
        data: &Value,
        key: &IdempotencyKey,
    ) -> Result<Value, OperationError>;

    async fn delete(&self, id: &str, key: &IdempotencyKey) -> Result<(), OperationError>;
}
