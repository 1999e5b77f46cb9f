//! The scheduler driving the sync service end to end

use std::sync::Arc;
use std::time::Duration;

use graft_core::SyncConfig;
use graft_distributor::SyncService;
use graft_distributor::model::*;
use graft_scheduler::Scheduler;
use graft_store::GraphStore;
use tokio::time::sleep;

use crate::fixtures::*;

const INTERVAL: Duration = Duration::from_millis(100);

fn config() -> SyncConfig {
    SyncConfig {
        source_graph: SOURCE.to_string(),
        audiences: vec!["minister".to_string()],
        ..Default::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_notified_changes_reach_the_view_on_the_next_tick() {
    let store = store_with(agenda(1)).await;
    let dyn_store: Arc<dyn GraphStore> = store.clone();
    let service = Arc::new(SyncService::from_config(dyn_store, &config()).unwrap());
    let (handle, task) = Scheduler::spawn(service, INTERVAL);

    handle
        .notify(inserts(vec![link("http://ex/agenda/1", HAS_PART, "http://ex/item/1")]))
        .unwrap();
    sleep(INTERVAL / 2).await;
    assert!(view(&store).await.is_empty());

    sleep(INTERVAL * 2).await;
    assert!(view(&store).await.contains(&lineage("http://ex/item/1", "http://ex/agenda/1")));

    // A later change is picked up by a later run.
    store.insert_triples(&iri(SOURCE), agenda(2)).await;
    handle
        .notify(inserts(vec![link("http://ex/agenda/2", HAS_PART, "http://ex/item/2")]))
        .unwrap();
    sleep(INTERVAL * 3).await;
    assert!(view(&store).await.contains(&lineage("http://ex/item/2", "http://ex/agenda/2")));

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.runs_started, 2);
    assert_eq!(snapshot.pending, 0);

    drop(handle);
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_irrelevant_changes_leave_views_untouched() {
    let store = store_with(agenda(1)).await;
    let dyn_store: Arc<dyn GraphStore> = store.clone();
    let service = Arc::new(SyncService::from_config(dyn_store, &config()).unwrap());
    let (handle, task) = Scheduler::spawn(service, INTERVAL);

    handle
        .notify(inserts(vec![link("http://ex/person/1", TITLE, "http://ex/elsewhere")]))
        .unwrap();
    sleep(INTERVAL * 2).await;

    assert!(view(&store).await.is_empty());
    assert_eq!(handle.snapshot().await.unwrap().runs_started, 1);
    assert_eq!(store.update_count(), 0);

    drop(handle);
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_failed_audience_run_is_retried_on_a_later_tick() {
    let store = store_with(agenda(1)).await;
    let dyn_store: Arc<dyn GraphStore> = store.clone();
    let service = Arc::new(SyncService::from_config(dyn_store, &config()).unwrap());
    let (handle, task) = Scheduler::spawn(Arc::clone(&service), INTERVAL);

    // Marker and seed go through, the first collection step does not.
    store.fail_updates_after(2);
    handle
        .notify(inserts(vec![link("http://ex/agenda/1", HAS_PART, "http://ex/item/1")]))
        .unwrap();
    sleep(INTERVAL * 3 / 2).await;
    assert!(view(&store).await.is_empty());
    assert!(service.has_backlog());

    // No new notification: the heartbeat alone brings the retry.
    store.heal();
    sleep(INTERVAL * 2).await;
    assert!(view(&store).await.contains(&lineage("http://ex/item/1", "http://ex/agenda/1")));
    assert!(!service.has_backlog());
    assert_eq!(handle.snapshot().await.unwrap().runs_started, 2);

    drop(handle);
    task.await.unwrap();
}
