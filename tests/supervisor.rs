//! Integration tests for the supervisor's sweep semantics against a real
//! in-memory state store.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use modelwatch::{
    config::AppConfig,
    engine::router::Route,
    models::{EventKind, Snapshot, SourceKind, WatchEvent},
    notification::{NotificationError, Notifier},
    persistence::{sqlite::SqliteStateStore, traits::StateStore},
    sources::{SourceError, SourceWatcher},
    supervisor::Supervisor,
    test_helpers::{item_snapshot, ItemBuilder},
};

/// A watcher that serves whatever snapshot the test has loaded into it.
struct ScriptedWatcher {
    source: SourceKind,
    entity: String,
    snapshot: Arc<Mutex<Snapshot>>,
}

impl ScriptedWatcher {
    fn new(entity: &str, snapshot: Snapshot) -> (Self, Arc<Mutex<Snapshot>>) {
        let slot = Arc::new(Mutex::new(snapshot));
        let watcher = Self {
            source: SourceKind::Github,
            entity: entity.to_string(),
            snapshot: Arc::clone(&slot),
        };
        (watcher, slot)
    }
}

#[async_trait]
impl SourceWatcher for ScriptedWatcher {
    fn source(&self) -> SourceKind {
        self.source
    }

    fn entity(&self) -> &str {
        &self.entity
    }

    async fn fetch(&self) -> Result<Snapshot, SourceError> {
        Ok(self.snapshot.lock().unwrap().clone())
    }
}

/// A watcher whose fetch always fails.
struct BrokenWatcher;

#[async_trait]
impl SourceWatcher for BrokenWatcher {
    fn source(&self) -> SourceKind {
        SourceKind::Huggingface
    }

    fn entity(&self) -> &str {
        "Z-Image"
    }

    async fn fetch(&self) -> Result<Snapshot, SourceError> {
        Err(SourceError::RateLimited("always failing".to_string()))
    }
}

/// Records deliveries, optionally failing the first few.
#[derive(Default)]
struct RecordingNotifier {
    delivered: Mutex<Vec<(WatchEvent, Route)>>,
    failures_remaining: AtomicUsize,
}

impl RecordingNotifier {
    fn failing_first(failures: usize) -> Self {
        Self { delivered: Mutex::new(Vec::new()), failures_remaining: AtomicUsize::new(failures) }
    }

    fn delivered_ids(&self) -> Vec<String> {
        self.delivered.lock().unwrap().iter().map(|(e, _)| e.item.id.clone()).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver(&self, event: &WatchEvent, route: &Route) -> Result<(), NotificationError> {
        if self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(NotificationError::MissingWebhook("default".to_string()));
        }
        self.delivered.lock().unwrap().push((event.clone(), route.clone()));
        Ok(())
    }
}

async fn in_memory_store() -> Arc<SqliteStateStore> {
    let store = SqliteStateStore::new("sqlite::memory:").await.unwrap();
    store.run_migrations().await.unwrap();
    Arc::new(store)
}

fn supervisor(
    watchers: Vec<Box<dyn SourceWatcher>>,
    store: Arc<SqliteStateStore>,
    notifier: Arc<RecordingNotifier>,
) -> Supervisor {
    Supervisor::builder()
        .config(AppConfig::default_for_tests())
        .store(store)
        .notifier(notifier)
        .watchers(watchers)
        .build()
        .unwrap()
}

#[tokio::test]
async fn first_sweep_is_quiet_and_later_items_notify_exactly_once() {
    let store = in_memory_store().await;
    let notifier = Arc::new(RecordingNotifier::default());

    let initial = Snapshot::Items(item_snapshot(vec![ItemBuilder::new("c1").at(0).build()]));
    let (watcher, slot) = ScriptedWatcher::new("Z-Image", initial);
    let supervisor = supervisor(vec![Box::new(watcher)], Arc::clone(&store), Arc::clone(&notifier));

    // First observation: state committed, nothing delivered.
    let summary = supervisor.run_once().await;
    assert_eq!(summary.events, 0);
    assert!(store.get("github:Z-Image").await.unwrap().is_some());
    assert!(notifier.delivered_ids().is_empty());

    // A new commit appears upstream.
    *slot.lock().unwrap() = Snapshot::Items(item_snapshot(vec![
        ItemBuilder::new("c2").at(10).build(),
        ItemBuilder::new("c1").at(0).build(),
    ]));
    let summary = supervisor.run_once().await;
    assert_eq!(summary.events, 1);
    assert_eq!(notifier.delivered_ids(), vec!["c2"]);

    // The same snapshot again is already explained by stored state.
    let summary = supervisor.run_once().await;
    assert_eq!(summary.events, 0);
    assert_eq!(notifier.delivered_ids(), vec!["c2"]);
}

#[tokio::test]
async fn failing_pair_does_not_block_healthy_pairs() {
    let store = in_memory_store().await;
    let notifier = Arc::new(RecordingNotifier::default());

    let (watcher, _slot) = ScriptedWatcher::new(
        "Z-Image",
        Snapshot::Items(item_snapshot(vec![ItemBuilder::new("c1").build()])),
    );
    let supervisor = supervisor(
        vec![Box::new(BrokenWatcher), Box::new(watcher)],
        Arc::clone(&store),
        notifier,
    );

    let summary = supervisor.run_once().await;

    assert_eq!(summary.pairs, 2);
    assert_eq!(summary.failures, 1);
    // The healthy pair was still observed and committed.
    assert!(store.get("github:Z-Image").await.unwrap().is_some());
    assert!(store.get("huggingface:Z-Image").await.unwrap().is_none());
}

#[tokio::test]
async fn failed_delivery_is_retried_from_the_same_baseline() {
    let store = in_memory_store().await;
    let notifier = Arc::new(RecordingNotifier::failing_first(1));

    let (watcher, slot) = ScriptedWatcher::new(
        "Z-Image",
        Snapshot::Items(item_snapshot(vec![ItemBuilder::new("c1").at(0).build()])),
    );
    let supervisor = supervisor(vec![Box::new(watcher)], Arc::clone(&store), Arc::clone(&notifier));

    // Baseline sweep.
    supervisor.run_once().await;

    *slot.lock().unwrap() = Snapshot::Items(item_snapshot(vec![
        ItemBuilder::new("c2").kind(EventKind::NewCommit).at(10).build(),
    ]));

    // Delivery fails, so the pair's state must not advance.
    let summary = supervisor.run_once().await;
    assert_eq!(summary.failures, 1);
    assert!(notifier.delivered_ids().is_empty());
    let record = store.get("github:Z-Image").await.unwrap().unwrap();
    assert_eq!(record.payload.seen_ids().unwrap(), &["c1".to_string()]);

    // The webhook recovers; the same event is delivered on the next sweep.
    let summary = supervisor.run_once().await;
    assert_eq!(summary.events, 1);
    assert_eq!(notifier.delivered_ids(), vec!["c2"]);
}

#[tokio::test]
async fn reset_restores_first_observation_semantics() {
    let store = in_memory_store().await;
    let notifier = Arc::new(RecordingNotifier::default());

    let (watcher, _slot) = ScriptedWatcher::new(
        "Z-Image",
        Snapshot::Items(item_snapshot(vec![ItemBuilder::new("c1").build()])),
    );
    let supervisor = supervisor(vec![Box::new(watcher)], Arc::clone(&store), Arc::clone(&notifier));

    supervisor.run_once().await;
    assert!(store.get("github:Z-Image").await.unwrap().is_some());

    store.reset().await.unwrap();
    assert!(store.get("github:Z-Image").await.unwrap().is_none());

    // The pair is treated as never observed: quiet again, state recommitted.
    let summary = supervisor.run_once().await;
    assert_eq!(summary.events, 0);
    assert!(notifier.delivered_ids().is_empty());
    assert!(store.get("github:Z-Image").await.unwrap().is_some());
}
