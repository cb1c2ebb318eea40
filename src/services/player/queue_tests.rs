use crate::services::player::{
    AddOutcome, CollectionMember, FetchBackendError, LoopMode, MediaFetchBackend, MetaCache,
    QueueError, TrackMetadata, TrackQueue,
};
use crate::storage::InMemoryStorage;
use crate::types::MediaId;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
#[error("Mock failure: {0}")]
struct MockError(String);

struct FetchBackendMock {
    metadata: Mutex<HashMap<String, TrackMetadata>>,
    collections: Mutex<HashMap<String, Vec<CollectionMember>>>,
    failing: Mutex<HashSet<String>>,
    download_gates: Mutex<HashMap<String, Arc<Notify>>>,
    resolve_calls: AtomicUsize,
    download_calls: AtomicUsize,
}

impl FetchBackendMock {
    fn new() -> Self {
        Self {
            metadata: Mutex::new(HashMap::new()),
            collections: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            download_gates: Mutex::new(HashMap::new()),
            resolve_calls: AtomicUsize::new(0),
            download_calls: AtomicUsize::new(0),
        }
    }

    fn with_track(self, id: &str, duration: u64) -> Self {
        self.metadata
            .lock()
            .unwrap()
            .insert(watch_url(id), metadata(id, duration));

        self
    }

    fn with_failing(self, url: &str) -> Self {
        self.failing.lock().unwrap().insert(url.to_string());

        self
    }

    fn with_collection(self, url: &str, members: Vec<CollectionMember>) -> Self {
        self.collections
            .lock()
            .unwrap()
            .insert(url.to_string(), members);

        self
    }

    fn gate_download(&self, url: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.download_gates
            .lock()
            .unwrap()
            .insert(url.to_string(), Arc::clone(&gate));

        gate
    }
}

#[async_trait]
impl MediaFetchBackend for FetchBackendMock {
    async fn resolve_metadata(&self, url: &str) -> Result<TrackMetadata, FetchBackendError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);

        if self.failing.lock().unwrap().contains(url) {
            return Err(FetchBackendError::new(MockError(url.to_string())));
        }

        self.metadata
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| FetchBackendError::new(MockError(format!("unknown url {}", url))))
    }

    async fn resolve_collection(
        &self,
        url: &str,
        max_entries: usize,
    ) -> Result<Vec<CollectionMember>, FetchBackendError> {
        self.collections
            .lock()
            .unwrap()
            .get(url)
            .map(|members| members.iter().take(max_entries).cloned().collect())
            .ok_or_else(|| FetchBackendError::new(MockError(format!("unknown collection {}", url))))
    }

    async fn download_range(
        &self,
        url: &str,
        start: u64,
        end: u64,
        destination: &Path,
    ) -> Result<(), FetchBackendError> {
        let gate = self.download_gates.lock().unwrap().get(url).cloned();

        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.download_calls.fetch_add(1, Ordering::SeqCst);

        tokio::fs::write(destination, format!("{}:{}-{}", url, start, end))
            .await
            .map_err(FetchBackendError::new)
    }
}

fn watch_url(id: &str) -> String {
    format!("https://media.example.com/watch?v={}", id)
}

fn playlist_url(id: &str) -> String {
    format!("https://media.example.com/playlist?list={}", id)
}

fn metadata(id: &str, duration: u64) -> TrackMetadata {
    TrackMetadata {
        id: MediaId(id.to_string()),
        url: watch_url(id),
        title: format!("Title of {}", id),
        channel_name: "Channel".to_string(),
        channel_url: "https://media.example.com/channel/1".to_string(),
        duration,
    }
}

fn member(id: &str, duration: Option<u64>) -> CollectionMember {
    CollectionMember {
        url: watch_url(id),
        metadata: duration.map(|duration| metadata(id, duration)),
    }
}

async fn make_queue(backend: Arc<FetchBackendMock>) -> Arc<TrackQueue> {
    let cache = Arc::new(MetaCache::create(Arc::new(InMemoryStorage::new())).await);
    let cache_dir = std::env::temp_dir().join(format!("jukebox-queue-{}", Uuid::new_v4()));

    Arc::new(TrackQueue::new(backend, cache, cache_dir))
}

async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }

        actix_rt::time::sleep(Duration::from_millis(5)).await;
    }

    panic!("Condition not met in time");
}

fn fragment_position(path: &Path) -> (String, String) {
    let fragment = path.file_name().unwrap().to_string_lossy().to_string();
    let item = path
        .parent()
        .unwrap()
        .file_name()
        .unwrap()
        .to_string_lossy()
        .to_string();

    (item, fragment)
}

#[actix_rt::test]
async fn should_return_none_on_empty_queue() {
    let backend = Arc::new(FetchBackendMock::new());
    let queue = make_queue(backend).await;

    assert_eq!(queue.get().await.unwrap(), None);
}

#[actix_rt::test]
async fn should_tolerate_advance_and_skip_on_empty_queue() {
    let backend = Arc::new(FetchBackendMock::new());
    let queue = make_queue(backend).await;

    queue.advance();
    queue.skip(3);

    assert_eq!(queue.get().await.unwrap(), None);
}

#[actix_rt::test]
async fn should_play_single_item_to_the_end() {
    let backend = Arc::new(FetchBackendMock::new().with_track("solo", 120));
    let queue = make_queue(Arc::clone(&backend)).await;

    queue.add(&watch_url("solo"));

    let path = queue.get().await.unwrap().unwrap();
    assert_eq!(
        fragment_position(&path),
        ("solo".to_string(), "0".to_string())
    );
    assert!(path.exists());

    queue.advance();

    assert_eq!(queue.get().await.unwrap(), None);
}

#[actix_rt::test]
async fn should_walk_fragments_of_long_item_in_order() {
    let backend = Arc::new(FetchBackendMock::new().with_track("long", 600));
    let queue = make_queue(Arc::clone(&backend)).await;

    queue.add(&watch_url("long"));

    for expected in ["0", "1", "2"] {
        let path = queue.get().await.unwrap().unwrap();
        assert_eq!(
            fragment_position(&path),
            ("long".to_string(), expected.to_string())
        );
        queue.advance();
    }

    assert_eq!(queue.get().await.unwrap(), None);
    assert_eq!(backend.download_calls.load(Ordering::SeqCst), 3);
}

#[actix_rt::test]
async fn should_hold_current_item_in_current_loop_mode() {
    let backend = Arc::new(
        FetchBackendMock::new()
            .with_track("first", 100)
            .with_track("second", 100),
    );
    let queue = make_queue(backend).await;

    queue.add(&watch_url("first"));
    queue.add(&watch_url("second"));
    queue.set_loop_mode(LoopMode::Current);

    queue.get().await.unwrap().unwrap();
    queue.advance();

    let path = queue.get().await.unwrap().unwrap();
    assert_eq!(fragment_position(&path).0, "first");
}

#[actix_rt::test]
async fn should_wrap_around_in_all_loop_mode() {
    let backend = Arc::new(
        FetchBackendMock::new()
            .with_track("first", 100)
            .with_track("second", 100),
    );
    let queue = make_queue(backend).await;

    queue.add(&watch_url("first"));
    queue.add(&watch_url("second"));
    queue.set_loop_mode(LoopMode::All);

    queue.get().await.unwrap().unwrap();
    queue.advance();

    let path = queue.get().await.unwrap().unwrap();
    assert_eq!(fragment_position(&path).0, "second");

    queue.advance();

    let path = queue.get().await.unwrap().unwrap();
    assert_eq!(fragment_position(&path).0, "first");
}

#[actix_rt::test]
async fn should_skip_past_current_loop_mode() {
    let backend = Arc::new(
        FetchBackendMock::new()
            .with_track("first", 100)
            .with_track("second", 100),
    );
    let queue = make_queue(backend).await;

    queue.add(&watch_url("first"));
    queue.add(&watch_url("second"));
    queue.set_loop_mode(LoopMode::Current);

    queue.get().await.unwrap().unwrap();
    queue.skip(1);

    let path = queue.get().await.unwrap().unwrap();
    assert_eq!(fragment_position(&path).0, "second");
}

#[actix_rt::test]
async fn should_saturate_skip_past_the_end() {
    let backend = Arc::new(FetchBackendMock::new().with_track("solo", 100));
    let queue = make_queue(backend).await;

    queue.add(&watch_url("solo"));
    queue.skip(10);

    assert_eq!(queue.get().await.unwrap(), None);
}

#[actix_rt::test]
async fn should_reset_fragment_cursor_on_skip() {
    let backend = Arc::new(
        FetchBackendMock::new()
            .with_track("long", 600)
            .with_track("next", 100),
    );
    let queue = make_queue(backend).await;

    queue.add(&watch_url("long"));
    queue.add(&watch_url("next"));

    queue.get().await.unwrap().unwrap();
    queue.advance();
    queue.get().await.unwrap().unwrap();

    queue.skip(1);

    let path = queue.get().await.unwrap().unwrap();
    assert_eq!(
        fragment_position(&path),
        ("next".to_string(), "0".to_string())
    );
}

#[actix_rt::test]
async fn should_not_download_already_cached_fragment_again() {
    let backend = Arc::new(FetchBackendMock::new().with_track("solo", 100));
    let cache = Arc::new(MetaCache::create(Arc::new(InMemoryStorage::new())).await);
    let cache_dir = std::env::temp_dir().join(format!("jukebox-queue-{}", Uuid::new_v4()));

    let queue = Arc::new(TrackQueue::new(
        Arc::clone(&backend) as Arc<dyn MediaFetchBackend + Send + Sync>,
        Arc::clone(&cache),
        cache_dir.clone(),
    ));

    queue.add(&watch_url("solo"));
    queue.get().await.unwrap().unwrap();
    queue.get().await.unwrap().unwrap();

    assert_eq!(backend.download_calls.load(Ordering::SeqCst), 1);

    // A fresh queue over the same cache directory finds the file in place.
    let reloaded = Arc::new(TrackQueue::new(
        Arc::clone(&backend) as Arc<dyn MediaFetchBackend + Send + Sync>,
        cache,
        cache_dir,
    ));

    reloaded.add(&watch_url("solo"));
    reloaded.get().await.unwrap().unwrap();

    assert_eq!(backend.download_calls.load(Ordering::SeqCst), 1);
    assert_eq!(backend.resolve_calls.load(Ordering::SeqCst), 1);
}

#[actix_rt::test]
async fn should_propagate_resolution_failure_from_get() {
    let url = watch_url("broken");
    let backend = Arc::new(FetchBackendMock::new().with_failing(&url));
    let queue = make_queue(backend).await;

    queue.add(&url);

    assert!(matches!(
        queue.get().await,
        Err(QueueError::Resolution(_))
    ));
}

#[actix_rt::test]
async fn should_restart_get_when_queue_is_cleared_mid_wait() {
    let url = watch_url("gated");
    let backend = Arc::new(FetchBackendMock::new().with_track("gated", 100));
    let gate = backend.gate_download(&url);
    let queue = make_queue(Arc::clone(&backend)).await;

    queue.add(&url);

    let pending = actix_rt::spawn({
        let queue = Arc::clone(&queue);
        async move { queue.get().await }
    });

    actix_rt::time::sleep(Duration::from_millis(20)).await;
    queue.clear();
    gate.notify_one();

    assert_eq!(pending.await.unwrap().unwrap(), None);
}

#[actix_rt::test]
async fn should_serve_new_cursor_when_skipped_mid_wait() {
    let gated_url = watch_url("gated");
    let backend = Arc::new(
        FetchBackendMock::new()
            .with_track("gated", 100)
            .with_track("other", 100),
    );
    let gate = backend.gate_download(&gated_url);
    let queue = make_queue(Arc::clone(&backend)).await;

    queue.add(&gated_url);
    queue.add(&watch_url("other"));

    let pending = actix_rt::spawn({
        let queue = Arc::clone(&queue);
        async move { queue.get().await }
    });

    actix_rt::time::sleep(Duration::from_millis(20)).await;
    queue.skip(1);
    gate.notify_one();

    let path = pending.await.unwrap().unwrap().unwrap();
    assert_eq!(fragment_position(&path).0, "other");
}

#[actix_rt::test]
async fn should_clear_queue_and_accept_new_items() {
    let backend = Arc::new(
        FetchBackendMock::new()
            .with_track("first", 100)
            .with_track("second", 100),
    );
    let queue = make_queue(backend).await;

    queue.add(&watch_url("first"));
    queue.get().await.unwrap().unwrap();

    queue.clear();
    assert!(queue.is_empty());
    assert_eq!(queue.get().await.unwrap(), None);

    queue.add(&watch_url("second"));
    let path = queue.get().await.unwrap().unwrap();
    assert_eq!(fragment_position(&path).0, "second");
}

#[actix_rt::test]
async fn should_append_collection_members_in_background() {
    let url = playlist_url("PL1");
    let backend = Arc::new(FetchBackendMock::new().with_collection(
        &url,
        vec![member("m1", Some(100)), member("m2", Some(100))],
    ));
    let queue = make_queue(Arc::clone(&backend)).await;

    let outcome = queue.add(&url);
    assert_eq!(outcome, AddOutcome::LoadingCollection);

    wait_until(|| queue.resolved_entries().entries.len() == 2).await;

    // Injected metadata means members never resolve over the network.
    assert_eq!(backend.resolve_calls.load(Ordering::SeqCst), 0);
}

#[actix_rt::test]
async fn should_resolve_member_without_injected_metadata_individually() {
    let url = playlist_url("PL1");
    let backend = Arc::new(
        FetchBackendMock::new()
            .with_track("m1", 100)
            .with_collection(&url, vec![member("m1", None)]),
    );
    let queue = make_queue(Arc::clone(&backend)).await;

    queue.add(&url);

    wait_until(|| queue.resolved_entries().entries.len() == 1).await;

    assert_eq!(backend.resolve_calls.load(Ordering::SeqCst), 1);
}

#[actix_rt::test]
async fn should_cap_collection_size() {
    let url = playlist_url("PLBIG");
    let members = (0..60)
        .map(|index| member(&format!("m{}", index), Some(100)))
        .collect();
    let backend = Arc::new(FetchBackendMock::new().with_collection(&url, members));
    let queue = make_queue(backend).await;

    queue.add(&url);

    wait_until(|| queue.resolved_entries().entries.len() == 50).await;
    actix_rt::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(queue.resolved_entries().entries.len(), 50);
}

#[actix_rt::test]
async fn should_append_nothing_when_collection_load_fails() {
    let backend = Arc::new(FetchBackendMock::new());
    let queue = make_queue(backend).await;

    let outcome = queue.add(&playlist_url("PLMISSING"));
    assert_eq!(outcome, AddOutcome::LoadingCollection);

    actix_rt::time::sleep(Duration::from_millis(50)).await;

    assert!(queue.is_empty());
}

#[actix_rt::test]
async fn should_queue_non_collection_url_immediately() {
    let backend = Arc::new(FetchBackendMock::new().with_track("solo", 100));
    let queue = make_queue(backend).await;

    let outcome = queue.add(&watch_url("solo"));

    assert_eq!(outcome, AddOutcome::QueuedTrack);
    assert!(!queue.is_empty());
}

#[actix_rt::test]
async fn should_remove_items_by_index_and_url() {
    let backend = Arc::new(
        FetchBackendMock::new()
            .with_track("first", 100)
            .with_track("second", 100)
            .with_track("third", 100),
    );
    let queue = make_queue(backend).await;

    queue.add(&watch_url("first"));
    queue.add(&watch_url("second"));
    queue.add(&watch_url("third"));

    assert!(queue.remove_by_index(1));
    assert!(!queue.remove_by_index(5));
    assert!(queue.remove_by_url(&watch_url("third")));
    assert!(!queue.remove_by_url(&watch_url("missing")));

    wait_until(|| queue.resolved_entries().entries.len() == 1).await;
    assert_eq!(
        queue.resolved_entries().entries[0].metadata.id.as_str(),
        "first"
    );
}

#[actix_rt::test]
async fn should_count_unresolved_items_in_snapshot() {
    let failing_url = watch_url("failing");
    let backend = Arc::new(
        FetchBackendMock::new()
            .with_track("fine", 100)
            .with_failing(&failing_url),
    );
    let queue = make_queue(backend).await;

    queue.add(&watch_url("fine"));
    queue.add(&failing_url);

    wait_until(|| queue.resolved_entries().entries.len() == 1).await;

    let snapshot = queue.resolved_entries();
    assert_eq!(snapshot.pending_count, 1);
    assert_eq!(snapshot.current_index, Some(0));
}

#[actix_rt::test]
async fn should_cycle_loop_modes_in_order() {
    let backend = Arc::new(FetchBackendMock::new());
    let queue = make_queue(backend).await;

    assert_eq!(queue.loop_mode(), LoopMode::Off);
    assert_eq!(queue.cycle_loop_mode(), LoopMode::Current);
    assert_eq!(queue.cycle_loop_mode(), LoopMode::All);
    assert_eq!(queue.cycle_loop_mode(), LoopMode::Off);
}
