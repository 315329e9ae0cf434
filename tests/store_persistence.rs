mod common;

use common::mocks::{MockNetworkFetcher, MockPresenter};
use common::{runtime_with, test_config};
use offline_first_lib::application::ports::DurableStore;
use offline_first_lib::application::services::HandlerRegistry;
use offline_first_lib::domain::value_objects::EntityKind;
use offline_first_lib::infrastructure::database::ConnectionPool;
use offline_first_lib::shared::config::AppConfig;
use offline_first_lib::shared::error::{AppError, StoreOpenError};
use offline_first_lib::state::OfflineRuntime;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn on_disk_config(path: &Path) -> AppConfig {
    let mut config = test_config();
    config.database.url = format!("sqlite://{}?mode=rwc", path.display());
    config
}

#[tokio::test]
async fn queue_and_flags_survive_a_restart() {
    let dir = TempDir::new().unwrap();
    let config = on_disk_config(&dir.path().join("offline.db"));

    {
        let pool = ConnectionPool::open(&config.database).await.unwrap();
        let t = runtime_with(config.clone(), pool, Some(true)).await;
        t.runtime.monitor.set_online(false).await.unwrap();
        t.runtime
            .mutations
            .create(EntityKind::Invoice, json!({"total": 40}))
            .await
            .unwrap();
        t.runtime.shutdown().await;
    }

    let pool = ConnectionPool::open(&config.database).await.unwrap();
    let t = runtime_with(config, pool, None).await;
    let monitor = &t.runtime.monitor;
    assert!(!monitor.is_online());
    assert!(monitor.was_offline());
    assert_eq!(monitor.pending_count(), 1);

    let pending = t.runtime.store.list_pending_operations().await.unwrap();
    assert_eq!(pending[0].entity, EntityKind::Invoice);
    assert_eq!(pending[0].data, json!({"total": 40}));

    // Invoices have no registered handler, so the drain records a failure.
    monitor.set_online(true).await.unwrap();
    let pending = t.runtime.store.list_pending_operations().await.unwrap();
    assert_eq!(pending[0].retries, 1);
    assert!(!monitor.was_offline());
    t.runtime.shutdown().await;
}

#[tokio::test]
async fn corrupted_store_is_reported_and_left_intact() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("offline.db");
    let garbage = vec![0x42u8; 4096];
    std::fs::write(&path, &garbage).unwrap();

    let result = OfflineRuntime::initialize(
        on_disk_config(&path),
        HandlerRegistry::new(),
        Arc::new(MockNetworkFetcher::new()),
        Arc::new(MockPresenter::default()),
    )
    .await;

    assert!(matches!(
        result,
        Err(AppError::StoreOpen(StoreOpenError::Corrupted { .. }))
    ));
    assert_eq!(std::fs::read(&path).unwrap(), garbage);
}

#[tokio::test]
async fn invalid_config_is_rejected_before_opening() {
    let mut config = test_config();
    config.database.max_connections = 0;

    let result = OfflineRuntime::initialize(
        config,
        HandlerRegistry::new(),
        Arc::new(MockNetworkFetcher::new()),
        Arc::new(MockPresenter::default()),
    )
    .await;

    assert!(matches!(result, Err(AppError::ConfigurationError(_))));
}
