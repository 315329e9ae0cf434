use crate::domain::entities::DrainReport;
use crate::domain::value_objects::SyncState;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatusEvent {
    pub status: SyncState,
    /// `None` when the queue length could not be read; keep the last known
    /// count in that case.
    pub pending_count: Option<u64>,
    pub at: DateTime<Utc>,
    /// Present on terminal events of a completed pass.
    pub report: Option<DrainReport>,
}

pub type StatusListener = Arc<dyn Fn(&SyncStatusEvent) + Send + Sync>;

#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: Mutex<BTreeMap<u64, StatusListener>>,
}

impl ListenerRegistry {
    fn lock(&self) -> MutexGuard<'_, BTreeMap<u64, StatusListener>> {
        // Listeners are plain callbacks; a panic in one must not wedge the registry.
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn subscribe(self: &Arc<Self>, listener: StatusListener) -> SyncSubscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().insert(id, listener);
        SyncSubscription {
            id,
            registry: Arc::downgrade(self),
        }
    }

    fn remove(&self, id: u64) -> bool {
        self.lock().remove(&id).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    /// Calls every listener registered at the time of the call, in
    /// subscription order, outside the registry lock.
    pub(crate) fn emit(&self, event: &SyncStatusEvent) {
        let listeners: Vec<StatusListener> = self.lock().values().cloned().collect();
        for listener in listeners {
            listener(event);
        }
    }
}

/// Handle returned by `SyncEngine::on_sync_status_change`.
#[must_use = "dropping the subscription keeps the listener registered; call unsubscribe"]
#[derive(Debug)]
pub struct SyncSubscription {
    id: u64,
    registry: Weak<ListenerRegistry>,
}

impl SyncSubscription {
    /// Returns `false` if the listener was already gone.
    pub fn unsubscribe(self) -> bool {
        self.registry
            .upgrade()
            .map(|registry| registry.remove(self.id))
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}
