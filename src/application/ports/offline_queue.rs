use crate::domain::value_objects::RetryState;
use crate::shared::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Bookkeeping applied to an entry after a failed replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureOutcome {
    pub retries: u32,
    pub retry_state: RetryState,
}

impl FailureOutcome {
    pub fn dead_lettered(&self) -> bool {
        self.retry_state.is_dead_lettered()
    }
}

/// Common shape of both durable offline queues.
#[async_trait]
pub trait OfflineQueue: Send + Sync {
    type Draft: Send + 'static;
    type Entry: Clone + Send + Sync + 'static;
    type Id: Copy + Send + Sync + std::fmt::Display + 'static;

    async fn enqueue(&self, draft: Self::Draft) -> Result<Self::Entry, AppError>;

    /// Every queued entry in replay order, whether or not it is due.
    async fn snapshot(&self) -> Result<Vec<Self::Entry>, AppError>;

    /// Entries eligible for replay at `now`, in replay order.
    async fn drain_all(&self, now: DateTime<Utc>) -> Result<Vec<Self::Entry>, AppError>;

    /// Removes an entry after a successful replay.
    async fn ack(&self, id: Self::Id) -> Result<(), AppError>;

    /// Records a failed replay and keeps the entry queued.
    async fn fail(
        &self,
        entry: &Self::Entry,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<FailureOutcome, AppError>;

    async fn len(&self) -> Result<u64, AppError>;

    async fn is_empty(&self) -> Result<bool, AppError> {
        Ok(self.len().await? == 0)
    }
}
