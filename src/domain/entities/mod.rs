pub mod entity_mirror;
pub mod network;
pub mod notification;
pub mod pending_operation;
pub mod raw_action;
pub mod reports;
pub mod sync_metadata;

pub use entity_mirror::EntityMirror;
pub use network::{InterceptedRequest, NetworkResponse, RequestMode};
pub use notification::{
    NotificationAction, NotificationData, NotificationDescriptor, PushPayload,
};
pub use pending_operation::{PendingOperation, PendingOperationDraft, PendingOperationPatch};
pub use raw_action::{LegacyQueuedRequest, RawAction, RawActionDraft, RawActionPatch};
pub use reports::{DrainReport, ReplayReport};
pub use sync_metadata::SyncMetadataRecord;
