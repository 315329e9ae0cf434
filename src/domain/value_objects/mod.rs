pub mod entity_kind;
pub mod idempotency_key;
pub mod operation_type;
pub mod queue_ids;
pub mod retry_state;
pub mod sync_state;

pub use entity_kind::EntityKind;
pub use idempotency_key::IdempotencyKey;
pub use operation_type::OperationType;
pub use queue_ids::{PendingOperationId, RawActionId};
pub use retry_state::RetryState;
pub use sync_state::SyncState;
