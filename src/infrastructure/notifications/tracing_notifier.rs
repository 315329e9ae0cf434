use crate::application::ports::{NotificationPresenter, SyncNotifier};
use crate::domain::entities::{
    DrainReport, NotificationData, NotificationDescriptor, PendingOperation,
};
use crate::shared::error::{InterceptError, OperationError};
use async_trait::async_trait;
use tracing::{info, warn};

/// Reports sync feedback through the log. Hosts with a UI supply their own
/// [`SyncNotifier`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSyncNotifier;

#[async_trait]
impl SyncNotifier for TracingSyncNotifier {
    async fn sync_completed(&self, report: &DrainReport) {
        info!(
            target: "offline::sync",
            synced = report.succeeded,
            "all pending changes synchronized"
        );
    }

    async fn operation_failing(&self, operation: &PendingOperation, error: &OperationError) {
        warn!(
            target: "offline::sync",
            id = operation.id.value(),
            entity = operation.entity.as_str(),
            operation = operation.operation_type.as_str(),
            retries = operation.retries,
            error = %error,
            "pending change keeps failing to synchronize"
        );
    }
}

/// Presenter for headless hosts: notifications are logged, never shown.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotificationPresenter;

#[async_trait]
impl NotificationPresenter for TracingNotificationPresenter {
    async fn show(&self, descriptor: &NotificationDescriptor) -> Result<(), InterceptError> {
        info!(
            target: "offline::interceptor",
            title = %descriptor.title,
            body = %descriptor.body,
            "notification"
        );
        Ok(())
    }

    async fn close(&self, _data: &NotificationData) -> Result<(), InterceptError> {
        Ok(())
    }

    async fn open_window(&self, url: &str) -> Result<(), InterceptError> {
        info!(target: "offline::interceptor", url, "open window requested");
        Ok(())
    }
}
