use super::sync_engine::{DrainOutcome, SyncEngine, SyncSubscription};
use crate::application::ports::DurableStore;
use crate::domain::value_objects::SyncState;
use crate::shared::error::AppError;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const IS_ONLINE_KEY: &str = "connectivity.is_online";
pub const WAS_OFFLINE_KEY: &str = "connectivity.was_offline";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivitySnapshot {
    pub is_online: bool,
    /// Sticky from the moment the device went offline until the next drain
    /// completes.
    pub was_offline: bool,
    pub is_syncing: bool,
    pub pending_count: u64,
}

/// Tracks online/offline transitions and triggers the sync engine when the
/// device comes back.
pub struct ConnectivityMonitor {
    store: Arc<dyn DurableStore>,
    engine: Arc<SyncEngine>,
    state: Arc<watch::Sender<ConnectivitySnapshot>>,
    subscription: Mutex<Option<SyncSubscription>>,
    transitions: tokio::sync::Mutex<()>,
    /// Bumped on every online to offline transition.
    offline_epoch: AtomicU64,
}

impl ConnectivityMonitor {
    /// Seeds the state from the persisted flags, subscribes to the engine's
    /// status broadcast, then reconciles with the platform signal if one is
    /// known.
    pub async fn start(
        store: Arc<dyn DurableStore>,
        engine: Arc<SyncEngine>,
        platform_online: Option<bool>,
    ) -> Result<Arc<Self>, AppError> {
        let is_online = store.read_flag(IS_ONLINE_KEY).await?.unwrap_or(true);
        let was_offline = store.read_flag(WAS_OFFLINE_KEY).await?.unwrap_or(false);
        let pending_count = engine.get_pending_count().await?;

        let (tx, _rx) = watch::channel(ConnectivitySnapshot {
            is_online,
            was_offline,
            is_syncing: engine.is_syncing(),
            pending_count,
        });
        let state = Arc::new(tx);

        let sink = Arc::clone(&state);
        let subscription = engine.on_sync_status_change(move |event| {
            sink.send_modify(|snapshot| {
                snapshot.is_syncing = event.status == SyncState::Syncing;
                if let Some(count) = event.pending_count {
                    snapshot.pending_count = count;
                }
            });
        });

        let monitor = Arc::new(Self {
            store,
            engine,
            state,
            subscription: Mutex::new(Some(subscription)),
            transitions: tokio::sync::Mutex::new(()),
            offline_epoch: AtomicU64::new(0),
        });

        info!(
            target: "offline::connectivity",
            is_online,
            was_offline,
            pending = pending_count,
            "connectivity monitor started"
        );

        if let Some(online) = platform_online {
            monitor.set_online(online).await?;
        }
        Ok(monitor)
    }

    pub fn watch(&self) -> watch::Receiver<ConnectivitySnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ConnectivitySnapshot {
        *self.state.borrow()
    }

    pub fn is_online(&self) -> bool {
        self.state.borrow().is_online
    }

    pub fn was_offline(&self) -> bool {
        self.state.borrow().was_offline
    }

    pub fn is_syncing(&self) -> bool {
        self.state.borrow().is_syncing
    }

    pub fn pending_count(&self) -> u64 {
        self.state.borrow().pending_count
    }

    /// Applies a platform connectivity signal. Returns the drain outcome when
    /// coming back online triggered one. The drain runs outside the
    /// transition lock, so an offline signal arriving mid-drain is applied
    /// at once.
    pub async fn set_online(&self, online: bool) -> Result<Option<DrainOutcome>, AppError> {
        let epoch = {
            let _transition = self.transitions.lock().await;
            let current = self.snapshot();

            if !online {
                if current.is_online || !current.was_offline {
                    self.offline_epoch.fetch_add(1, Ordering::AcqRel);
                    self.store.write_flag(IS_ONLINE_KEY, false).await?;
                    self.store.write_flag(WAS_OFFLINE_KEY, true).await?;
                    self.state.send_modify(|snapshot| {
                        snapshot.is_online = false;
                        snapshot.was_offline = true;
                    });
                    info!(target: "offline::connectivity", "device went offline");
                }
                return Ok(None);
            }

            if current.is_online && !current.was_offline {
                return Ok(None);
            }

            if !current.is_online {
                self.store.write_flag(IS_ONLINE_KEY, true).await?;
                self.state.send_modify(|snapshot| snapshot.is_online = true);
                info!(target: "offline::connectivity", "device back online");
            }

            if !current.was_offline {
                return Ok(None);
            }
            self.offline_epoch.load(Ordering::Acquire)
        };

        self.drain(epoch).await.map(Some)
    }

    /// Drains now, regardless of `was_offline`. Does nothing while offline.
    pub async fn manual_sync(&self) -> Result<Option<DrainOutcome>, AppError> {
        if !self.is_online() {
            debug!(target: "offline::connectivity", "manual sync ignored while offline");
            return Ok(None);
        }
        let epoch = self.offline_epoch.load(Ordering::Acquire);
        self.drain(epoch).await.map(Some)
    }

    pub async fn refresh_pending_count(&self) -> Result<u64, AppError> {
        let count = self.engine.get_pending_count().await?;
        self.state
            .send_modify(|snapshot| snapshot.pending_count = count);
        Ok(count)
    }

    /// Follows a stream of platform signals until the sender is dropped.
    pub fn follow(self: &Arc<Self>, mut signals: watch::Receiver<bool>) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                let online = *signals.borrow_and_update();
                if let Err(err) = monitor.set_online(online).await {
                    warn!(
                        target: "offline::connectivity",
                        error = %err,
                        "failed to apply connectivity change"
                    );
                }
                if signals.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    pub fn shutdown(&self) {
        let subscription = self
            .subscription
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
            debug!(target: "offline::connectivity", "unsubscribed from sync status");
        }
    }

    /// `epoch` is the offline-transition count observed before draining.
    /// `was_offline` is cleared only if the device stayed online throughout.
    async fn drain(&self, epoch: u64) -> Result<DrainOutcome, AppError> {
        let outcome = self.engine.process_pending_operations().await?;
        if outcome.is_completed() {
            let _transition = self.transitions.lock().await;
            let stayed_online =
                self.offline_epoch.load(Ordering::Acquire) == epoch && self.is_online();
            if stayed_online && self.was_offline() {
                self.store.write_flag(WAS_OFFLINE_KEY, false).await?;
                self.state.send_modify(|snapshot| snapshot.was_offline = false);
            } else if !stayed_online {
                debug!(
                    target: "offline::connectivity",
                    "went offline during drain, keeping was_offline"
                );
            }
        }
        self.refresh_pending_count().await?;
        Ok(outcome)
    }
}

impl Drop for ConnectivityMonitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{EntityHandler, SyncNotifier};
    use crate::application::services::retry_policy::RetryPolicy;
    use crate::application::services::sync_engine::{HandlerRegistry, SyncEngineSettings};
    use crate::domain::entities::{DrainReport, PendingOperation, PendingOperationDraft};
    use crate::domain::value_objects::{EntityKind, IdempotencyKey};
    use crate::infrastructure::database::{ConnectionPool, SqliteDurableStore};
    use crate::shared::error::OperationError;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::time::Duration;
    use tokio::sync::Notify;

    struct SilentNotifier;

    #[async_trait]
    impl SyncNotifier for SilentNotifier {
        async fn sync_completed(&self, _report: &DrainReport) {}
        async fn operation_failing(&self, _operation: &PendingOperation, _error: &OperationError) {}
    }

    /// Blocks every create until `release` is notified.
    struct GatedHandler {
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl EntityHandler for GatedHandler {
        fn kind(&self) -> EntityKind {
            EntityKind::Provider
        }

        async fn create(&self, data: &Value, _key: &IdempotencyKey) -> Result<Value, OperationError> {
            self.entered.notify_one();
            self.release.notified().await;
            let mut body = data.clone();
            body["id"] = json!("p-1");
            Ok(body)
        }

        async fn update(
            &self,
            _id: &str,
            data: &Value,
            _key: &IdempotencyKey,
        ) -> Result<Value, OperationError> {
            Ok(data.clone())
        }

        async fn delete(&self, _id: &str, _key: &IdempotencyKey) -> Result<(), OperationError> {
            Ok(())
        }
    }

    async fn setup() -> (Arc<dyn DurableStore>, Arc<SyncEngine>) {
        setup_with(HandlerRegistry::new()).await
    }

    async fn setup_with(handlers: HandlerRegistry) -> (Arc<dyn DurableStore>, Arc<SyncEngine>) {
        let pool = ConnectionPool::in_memory().await.unwrap();
        let store: Arc<dyn DurableStore> = Arc::new(SqliteDurableStore::new(pool));
        let engine = Arc::new(SyncEngine::new(
            Arc::clone(&store),
            handlers,
            Arc::new(SilentNotifier),
            SyncEngineSettings {
                retry_policy: RetryPolicy::immediate(),
                advisory_retry_threshold: 3,
                lease_ttl: None,
            },
        ));
        (store, engine)
    }

    #[tokio::test]
    async fn going_offline_persists_both_flags() {
        let (store, engine) = setup().await;
        let monitor = ConnectivityMonitor::start(Arc::clone(&store), engine, Some(true))
            .await
            .unwrap();

        assert_eq!(monitor.set_online(false).await.unwrap(), None);
        assert!(!monitor.is_online());
        assert!(monitor.was_offline());
        assert_eq!(store.read_flag(IS_ONLINE_KEY).await.unwrap(), Some(false));
        assert_eq!(store.read_flag(WAS_OFFLINE_KEY).await.unwrap(), Some(true));
    }

    #[tokio::test]
    async fn coming_back_online_drains_and_clears_was_offline() {
        let (store, engine) = setup().await;
        let monitor = ConnectivityMonitor::start(Arc::clone(&store), engine, Some(false))
            .await
            .unwrap();
        let mut rx = monitor.watch();

        let outcome = monitor.set_online(true).await.unwrap();
        assert!(outcome.unwrap().is_completed());
        assert!(monitor.is_online());
        assert!(!monitor.was_offline());
        assert_eq!(store.read_flag(WAS_OFFLINE_KEY).await.unwrap(), Some(false));
        assert!(rx.has_changed().unwrap());
        assert!(!rx.borrow_and_update().is_syncing);
    }

    #[tokio::test]
    async fn online_without_prior_outage_does_not_drain() {
        let (store, engine) = setup().await;
        let monitor = ConnectivityMonitor::start(store, engine, Some(true))
            .await
            .unwrap();
        assert_eq!(monitor.set_online(true).await.unwrap(), None);
    }

    #[tokio::test]
    async fn flags_survive_a_restart() {
        let (store, engine) = setup().await;
        let monitor = ConnectivityMonitor::start(Arc::clone(&store), Arc::clone(&engine), None)
            .await
            .unwrap();
        monitor.set_online(false).await.unwrap();
        monitor.shutdown();
        drop(monitor);

        let restarted = ConnectivityMonitor::start(store, engine, None).await.unwrap();
        assert!(!restarted.is_online());
        assert!(restarted.was_offline());
    }

    #[tokio::test]
    async fn manual_sync_is_a_no_op_offline() {
        let (store, engine) = setup().await;
        store
            .enqueue_pending_operation(PendingOperationDraft::create(
                EntityKind::Provider,
                json!({}),
            ))
            .await
            .unwrap();
        let monitor = ConnectivityMonitor::start(store, engine, Some(false))
            .await
            .unwrap();
        assert_eq!(monitor.pending_count(), 1);
        assert_eq!(monitor.manual_sync().await.unwrap(), None);
        assert_eq!(monitor.pending_count(), 1);
    }

    #[tokio::test]
    async fn engine_events_update_pending_count() {
        let (store, engine) = setup().await;
        let monitor = ConnectivityMonitor::start(Arc::clone(&store), Arc::clone(&engine), Some(true))
            .await
            .unwrap();
        store
            .enqueue_pending_operation(PendingOperationDraft::create(
                EntityKind::Provider,
                json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(monitor.pending_count(), 0);

        // No provider handler is registered, so the operation stays queued.
        engine.process_pending_operations().await.unwrap();
        assert_eq!(monitor.pending_count(), 1);
        assert!(!monitor.is_syncing());

        monitor.shutdown();
        store
            .enqueue_pending_operation(PendingOperationDraft::create(
                EntityKind::Provider,
                json!({}),
            ))
            .await
            .unwrap();
        engine.process_pending_operations().await.unwrap();
        assert_eq!(monitor.pending_count(), 1);
    }

    #[tokio::test]
    async fn offline_signal_is_applied_while_a_drain_is_running() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let handlers = HandlerRegistry::new().with(Arc::new(GatedHandler {
            entered: Arc::clone(&entered),
            release: Arc::clone(&release),
        }));
        let (store, engine) = setup_with(handlers).await;
        store
            .enqueue_pending_operation(PendingOperationDraft::create(
                EntityKind::Provider,
                json!({"code": "P1"}),
            ))
            .await
            .unwrap();
        let monitor = ConnectivityMonitor::start(Arc::clone(&store), engine, Some(false))
            .await
            .unwrap();

        let reconnect = {
            let monitor = Arc::clone(&monitor);
            tokio::spawn(async move { monitor.set_online(true).await })
        };
        entered.notified().await;

        let offline = tokio::time::timeout(Duration::from_millis(500), monitor.set_online(false))
            .await
            .expect("offline signal must not wait for the drain");
        assert_eq!(offline.unwrap(), None);
        assert!(!monitor.is_online());
        assert_eq!(store.read_flag(IS_ONLINE_KEY).await.unwrap(), Some(false));

        release.notify_one();
        let outcome = reconnect.await.unwrap().unwrap();
        assert!(outcome.unwrap().is_completed());
        assert!(!monitor.is_online());
        assert!(monitor.was_offline());
        assert_eq!(store.read_flag(WAS_OFFLINE_KEY).await.unwrap(), Some(true));
        assert_eq!(monitor.pending_count(), 0);
    }

    #[tokio::test]
    async fn unreadable_queue_keeps_last_pending_count() {
        let pool = ConnectionPool::in_memory().await.unwrap();
        let store: Arc<dyn DurableStore> = Arc::new(SqliteDurableStore::new(pool.clone()));
        let engine = Arc::new(SyncEngine::new(
            Arc::clone(&store),
            HandlerRegistry::new(),
            Arc::new(SilentNotifier),
            SyncEngineSettings {
                retry_policy: RetryPolicy::immediate(),
                advisory_retry_threshold: 3,
                lease_ttl: None,
            },
        ));
        store
            .enqueue_pending_operation(PendingOperationDraft::create(
                EntityKind::Provider,
                json!({}),
            ))
            .await
            .unwrap();
        let monitor = ConnectivityMonitor::start(Arc::clone(&store), Arc::clone(&engine), Some(true))
            .await
            .unwrap();
        assert_eq!(monitor.pending_count(), 1);

        let counts = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&counts);
        let _sub = engine.on_sync_status_change(move |event| {
            sink.lock().unwrap().push(event.pending_count);
        });

        pool.close().await;
        assert!(engine.process_pending_operations().await.is_err());

        assert!(counts.lock().unwrap().iter().all(Option::is_none));
        assert!(!counts.lock().unwrap().is_empty());
        assert_eq!(monitor.pending_count(), 1);
        assert!(!monitor.is_syncing());
    }
}
