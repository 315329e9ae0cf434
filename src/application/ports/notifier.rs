use crate::domain::entities::{
    DrainReport, NotificationData, NotificationDescriptor, PendingOperation,
};
use crate::shared::error::{InterceptError, OperationError};
use async_trait::async_trait;

/// User-facing sync feedback.
#[async_trait]
pub trait SyncNotifier: Send + Sync {
    /// The queue is empty after a drain pass.
    async fn sync_completed(&self, report: &DrainReport);

    /// `operation` has failed at least the advisory number of times.
    async fn operation_failing(&self, operation: &PendingOperation, error: &OperationError);
}

#[async_trait]
pub trait NotificationPresenter: Send + Sync {
    async fn show(&self, descriptor: &NotificationDescriptor) -> Result<(), InterceptError>;

    async fn close(&self, data: &NotificationData) -> Result<(), InterceptError>;

    async fn open_window(&self, url: &str) -> Result<(), InterceptError>;
}
