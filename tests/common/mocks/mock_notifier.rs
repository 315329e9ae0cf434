use async_trait::async_trait;
use offline_first_lib::application::ports::{NotificationPresenter, SyncNotifier};
use offline_first_lib::domain::entities::{
    DrainReport, NotificationData, NotificationDescriptor, PendingOperation,
};
use offline_first_lib::shared::error::{InterceptError, OperationError};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MockSyncNotifier {
    completed: Arc<RwLock<Vec<DrainReport>>>,
    failing: Arc<RwLock<Vec<(i64, u32, OperationError)>>>,
}

impl MockSyncNotifier {
    pub async fn completed(&self) -> Vec<DrainReport> {
        self.completed.read().await.clone()
    }

    /// `(operation id, retries, error)` for every failing notice.
    pub async fn failing(&self) -> Vec<(i64, u32, OperationError)> {
        self.failing.read().await.clone()
    }
}

#[async_trait]
impl SyncNotifier for MockSyncNotifier {
    async fn sync_completed(&self, report: &DrainReport) {
        self.completed.write().await.push(report.clone());
    }

    async fn operation_failing(&self, operation: &PendingOperation, error: &OperationError) {
        self.failing
            .write()
            .await
            .push((operation.id.value(), operation.retries, error.clone()));
    }
}

#[derive(Debug, Default)]
pub struct MockPresenter {
    shown: Arc<RwLock<Vec<NotificationDescriptor>>>,
    opened: Arc<RwLock<Vec<String>>>,
}

impl MockPresenter {
    pub async fn shown(&self) -> Vec<NotificationDescriptor> {
        self.shown.read().await.clone()
    }

    pub async fn opened(&self) -> Vec<String> {
        self.opened.read().await.clone()
    }
}

#[async_trait]
impl NotificationPresenter for MockPresenter {
    async fn show(&self, descriptor: &NotificationDescriptor) -> Result<(), InterceptError> {
        self.shown.write().await.push(descriptor.clone());
        Ok(())
    }

    async fn close(&self, _data: &NotificationData) -> Result<(), InterceptError> {
        Ok(())
    }

    async fn open_window(&self, url: &str) -> Result<(), InterceptError> {
        self.opened.write().await.push(url.to_string());
        Ok(())
    }
}
