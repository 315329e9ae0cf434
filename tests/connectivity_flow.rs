mod common;

use common::mocks::RemoteMode;
use common::runtime;
use offline_first_lib::application::ports::DurableStore;
use offline_first_lib::application::services::{DrainOutcome, MutationOutcome};
use offline_first_lib::domain::value_objects::{EntityKind, SyncState};
use offline_first_lib::shared::error::OperationError;
use serde_json::json;

#[tokio::test]
async fn offline_mutations_drain_on_reconnect() {
    let t = runtime(Some(true)).await;
    let monitor = &t.runtime.monitor;
    let mutations = &t.runtime.mutations;

    monitor.set_online(false).await.unwrap();
    assert!(!monitor.is_online());
    assert!(monitor.was_offline());

    let created = mutations
        .create(EntityKind::Provider, json!({"code": "P1"}))
        .await
        .unwrap();
    assert!(created.is_queued());
    let updated = mutations
        .update(EntityKind::Client, "c1", json!({"name": "Offline edit"}))
        .await
        .unwrap();
    assert!(updated.is_queued());
    assert_eq!(monitor.pending_count(), 2);
    assert!(t.providers.calls().await.is_empty());

    let optimistic = t
        .runtime
        .store
        .get_mirror(&EntityKind::Client, "c1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(optimistic.data["name"], "Offline edit");

    let outcome = monitor.set_online(true).await.unwrap();
    assert!(matches!(outcome, Some(DrainOutcome::Completed(ref r)) if r.succeeded == 2));
    assert!(monitor.is_online());
    assert!(!monitor.was_offline());
    assert_eq!(monitor.pending_count(), 0);
    assert!(!monitor.is_syncing());
    assert_eq!(t.notifier.completed().await.len(), 1);

    let metadata = t.runtime.store.list_sync_metadata().await.unwrap();
    assert!(
        metadata
            .iter()
            .any(|m| m.key == "provider" && m.status == SyncState::Idle)
    );
}

#[tokio::test]
async fn unreachable_remote_falls_back_to_queue() {
    let t = runtime(Some(true)).await;
    t.providers.set_mode(RemoteMode::Unreachable).await;

    let outcome = t
        .runtime
        .mutations
        .create(EntityKind::Provider, json!({"code": "P7"}))
        .await
        .unwrap();
    assert!(matches!(outcome, MutationOutcome::Queued(_)));
    assert_eq!(t.runtime.monitor.pending_count(), 1);

    t.providers.set_mode(RemoteMode::Accept).await;
    let drained = t.runtime.monitor.manual_sync().await.unwrap();
    assert!(drained.is_some_and(|o| o.is_completed()));
    assert_eq!(t.runtime.engine.get_pending_count().await.unwrap(), 0);
    assert_eq!(t.providers.calls().await.len(), 2);
}

#[tokio::test]
async fn rejection_is_returned_to_the_caller() {
    let t = runtime(Some(true)).await;
    t.clients.set_mode(RemoteMode::Reject).await;

    let err = t
        .runtime
        .mutations
        .create(EntityKind::Client, json!({"name": "Bad"}))
        .await
        .unwrap_err();
    assert!(matches!(err, OperationError::Rejected(_)));
    assert_eq!(t.runtime.engine.get_pending_count().await.unwrap(), 0);
}

#[tokio::test]
async fn online_mutation_refreshes_the_mirror() {
    let t = runtime(Some(true)).await;
    let outcome = t
        .runtime
        .mutations
        .create(EntityKind::Provider, json!({"code": "P3"}))
        .await
        .unwrap();
    let MutationOutcome::Applied(Some(mirror)) = outcome else {
        panic!("expected the create to apply, got {outcome:?}");
    };

    let deleted = t
        .runtime
        .mutations
        .delete(EntityKind::Provider, mirror.id.clone())
        .await
        .unwrap();
    assert!(matches!(deleted, MutationOutcome::Applied(Some(ref m)) if m.is_deleted()));
    assert!(
        t.runtime
            .store
            .list_mirrors(&EntityKind::Provider)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn platform_signals_are_followed() {
    let t = runtime(Some(true)).await;
    let (tx, rx) = tokio::sync::watch::channel(true);
    let mut states = t.runtime.monitor.watch();
    let task = t.runtime.monitor.follow(rx);

    tx.send(false).unwrap();
    states
        .wait_for(|snapshot| !snapshot.is_online)
        .await
        .unwrap();
    assert!(t.runtime.monitor.was_offline());

    tx.send(true).unwrap();
    states
        .wait_for(|snapshot| snapshot.is_online && !snapshot.was_offline)
        .await
        .unwrap();

    drop(tx);
    task.await.unwrap();
    t.runtime.shutdown().await;
}
