use super::retry_policy::RetryPolicy;
use crate::application::ports::{DurableStore, FailureOutcome, OfflineQueue};
use crate::domain::entities::{
    PendingOperation, PendingOperationDraft, PendingOperationPatch, RawAction, RawActionDraft,
    RawActionPatch,
};
use crate::domain::value_objects::{PendingOperationId, RawActionId, RetryState};
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

/// Queue of entity mutations replayed by the sync engine.
#[derive(Clone)]
pub struct PendingOperationQueue {
    store: Arc<dyn DurableStore>,
    policy: RetryPolicy,
}

impl PendingOperationQueue {
    pub fn new(store: Arc<dyn DurableStore>, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn dead_lettered(&self) -> Result<Vec<PendingOperation>, AppError> {
        Ok(self
            .snapshot()
            .await?
            .into_iter()
            .filter(|op| op.retry_state.is_dead_lettered())
            .collect())
    }

    /// Makes an entry immediately eligible again, whatever its state.
    pub async fn requeue(&self, id: PendingOperationId) -> Result<(), AppError> {
        self.store
            .update_pending_operation(id, PendingOperationPatch::requeue())
            .await?;
        info!(target: "offline::sync", id = id.value(), "pending operation requeued");
        Ok(())
    }

    pub async fn discard(&self, id: PendingOperationId) -> Result<bool, AppError> {
        let removed = self.store.delete_pending_operation(id).await?;
        if removed {
            warn!(target: "offline::sync", id = id.value(), "pending operation discarded");
        }
        Ok(removed)
    }
}

#[async_trait]
impl OfflineQueue for PendingOperationQueue {
    type Draft = PendingOperationDraft;
    type Entry = PendingOperation;
    type Id = PendingOperationId;

    async fn enqueue(&self, draft: PendingOperationDraft) -> Result<PendingOperation, AppError> {
        self.store.enqueue_pending_operation(draft).await
    }

    async fn snapshot(&self) -> Result<Vec<PendingOperation>, AppError> {
        self.store.list_pending_operations().await
    }

    async fn drain_all(&self, now: DateTime<Utc>) -> Result<Vec<PendingOperation>, AppError> {
        Ok(self
            .snapshot()
            .await?
            .into_iter()
            .filter(|op| op.retry_state.is_ready(now))
            .collect())
    }

    async fn ack(&self, id: PendingOperationId) -> Result<(), AppError> {
        self.store.delete_pending_operation(id).await?;
        Ok(())
    }

    async fn fail(
        &self,
        entry: &PendingOperation,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<FailureOutcome, AppError> {
        let retries = entry.retries.saturating_add(1);
        let retry_state = self.policy.next_state(retries, error, now);
        self.store
            .update_pending_operation(
                entry.id,
                PendingOperationPatch::failure(retries, error.to_string(), retry_state.clone()),
            )
            .await?;
        Ok(FailureOutcome {
            retries,
            retry_state,
        })
    }

    async fn len(&self) -> Result<u64, AppError> {
        self.store.count_pending_operations().await
    }
}

/// Queue of raw HTTP writes replayed by the interceptor.
#[derive(Clone)]
pub struct RawActionQueue {
    store: Arc<dyn DurableStore>,
    policy: RetryPolicy,
}

impl RawActionQueue {
    pub fn new(store: Arc<dyn DurableStore>, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    /// Enqueues every draft atomically, skipping ones already stored.
    pub async fn enqueue_batch(
        &self,
        drafts: Vec<RawActionDraft>,
    ) -> Result<Vec<RawAction>, AppError> {
        self.store.enqueue_raw_actions(drafts).await
    }

    pub async fn requeue(&self, id: RawActionId) -> Result<(), AppError> {
        self.store
            .update_raw_action(
                id,
                RawActionPatch {
                    retry_state: Some(RetryState::Pending),
                    ..Default::default()
                },
            )
            .await
    }

    pub async fn discard(&self, id: RawActionId) -> Result<bool, AppError> {
        self.store.delete_raw_action(id).await
    }
}

#[async_trait]
impl OfflineQueue for RawActionQueue {
    type Draft = RawActionDraft;
    type Entry = RawAction;
    type Id = RawActionId;

    async fn enqueue(&self, draft: RawActionDraft) -> Result<RawAction, AppError> {
        self.store.enqueue_raw_action(draft).await
    }

    async fn snapshot(&self) -> Result<Vec<RawAction>, AppError> {
        self.store.list_raw_actions().await
    }

    async fn drain_all(&self, now: DateTime<Utc>) -> Result<Vec<RawAction>, AppError> {
        Ok(self
            .snapshot()
            .await?
            .into_iter()
            .filter(|action| action.retry_state.is_ready(now))
            .collect())
    }

    async fn ack(&self, id: RawActionId) -> Result<(), AppError> {
        self.store.delete_raw_action(id).await?;
        Ok(())
    }

    async fn fail(
        &self,
        entry: &RawAction,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<FailureOutcome, AppError> {
        let retries = entry.retries.saturating_add(1);
        let retry_state = self.policy.next_state(retries, error, now);
        self.store
            .update_raw_action(
                entry.id,
                RawActionPatch {
                    retries: Some(retries),
                    error: Some(Some(error.to_string())),
                    retry_state: Some(retry_state.clone()),
                },
            )
            .await?;
        Ok(FailureOutcome {
            retries,
            retry_state,
        })
    }

    async fn len(&self) -> Result<u64, AppError> {
        self.store.count_raw_actions().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::EntityKind;
    use crate::infrastructure::database::{ConnectionPool, SqliteDurableStore};
    use serde_json::json;
    use std::time::Duration;

    async fn setup_store() -> Arc<dyn DurableStore> {
        let pool = ConnectionPool::in_memory().await.unwrap();
        Arc::new(SqliteDurableStore::new(pool))
    }

    #[tokio::test]
    async fn failed_entries_wait_for_their_backoff() {
        let store = setup_store().await;
        let policy = RetryPolicy::new(Duration::from_secs(30), Duration::from_secs(60), None);
        let queue = PendingOperationQueue::new(store, policy);
        let op = queue
            .enqueue(PendingOperationDraft::create(EntityKind::Product, json!({})))
            .await
            .unwrap();

        let now = Utc::now();
        let outcome = queue.fail(&op, "HTTP 503", now).await.unwrap();
        assert_eq!(outcome.retries, 1);
        assert!(!outcome.dead_lettered());

        assert!(queue.drain_all(now).await.unwrap().is_empty());
        let later = now + chrono::Duration::seconds(31);
        assert_eq!(queue.drain_all(later).await.unwrap().len(), 1);
        assert_eq!(queue.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn dead_lettered_entries_return_only_when_requeued() {
        let store = setup_store().await;
        let policy = RetryPolicy::new(Duration::ZERO, Duration::ZERO, Some(1));
        let queue = PendingOperationQueue::new(store, policy);
        let op = queue
            .enqueue(PendingOperationDraft::delete(EntityKind::Client, "c1"))
            .await
            .unwrap();

        let outcome = queue.fail(&op, "HTTP 410", Utc::now()).await.unwrap();
        assert!(outcome.dead_lettered());
        assert!(queue.drain_all(Utc::now()).await.unwrap().is_empty());
        assert_eq!(queue.dead_lettered().await.unwrap().len(), 1);

        queue.requeue(op.id).await.unwrap();
        let ready = queue.drain_all(Utc::now()).await.unwrap();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].retries, 1);

        assert!(queue.discard(op.id).await.unwrap());
        assert!(queue.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn raw_actions_share_the_queue_contract() {
        let store = setup_store().await;
        let queue = RawActionQueue::new(store, RetryPolicy::immediate());
        let action = queue
            .enqueue(RawActionDraft {
                url: "/api/invoices".to_string(),
                method: "POST".to_string(),
                headers: Default::default(),
                body: Some(r#"{"total":1}"#.to_string()),
                timestamp: None,
            })
            .await
            .unwrap();

        let outcome = queue.fail(&action, "offline", Utc::now()).await.unwrap();
        assert_eq!(outcome.retries, 1);
        let ready = queue.drain_all(Utc::now()).await.unwrap();
        assert_eq!(ready[0].error.as_deref(), Some("offline"));

        queue.ack(action.id).await.unwrap();
        assert_eq!(queue.len().await.unwrap(), 0);
    }
}
