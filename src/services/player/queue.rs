use crate::services::player::{
    CollectionLoader, DownloadError, MediaFetchBackend, MetaCache, ResolveError, Track,
    TrackMetadata,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopMode {
    Off,
    Current,
    All,
}

impl LoopMode {
    pub(crate) fn cycled(self) -> Self {
        match self {
            LoopMode::Off => LoopMode::Current,
            LoopMode::Current => LoopMode::All,
            LoopMode::All => LoopMode::Off,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub(crate) enum QueueError {
    #[error(transparent)]
    Resolution(#[from] ResolveError),
    #[error(transparent)]
    Download(#[from] DownloadError),
    #[error("Media item has no playable fragments")]
    NoPlayableContent,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum AddOutcome {
    QueuedTrack,
    LoadingCollection,
}

pub(crate) struct QueueEntry {
    pub(crate) index: usize,
    pub(crate) metadata: Arc<TrackMetadata>,
}

pub(crate) struct QueueSnapshot {
    pub(crate) entries: Vec<QueueEntry>,
    pub(crate) pending_count: usize,
    pub(crate) current_index: Option<usize>,
}

struct QueueState {
    tracks: Vec<Arc<Track>>,
    current_track: usize,
    current_fragment: usize,
    loop_mode: LoopMode,
    // Bumped by every mutation that moves the cursor under a waiter.
    generation: u64,
}

impl QueueState {
    fn next_position(&self) -> Option<(usize, usize)> {
        let track = self.tracks.get(self.current_track)?;
        let count = track.fragment_count().unwrap_or(0);

        if self.current_fragment + 1 < count {
            return Some((self.current_track, self.current_fragment + 1));
        }

        match self.loop_mode {
            LoopMode::Current => Some((self.current_track, 0)),
            LoopMode::Off if self.current_track + 1 < self.tracks.len() => {
                Some((self.current_track + 1, 0))
            }
            LoopMode::Off => None,
            LoopMode::All => Some(((self.current_track + 1) % self.tracks.len(), 0)),
        }
    }
}

/// Ordered playback queue with a (item, fragment) cursor. The lock is held
/// only for cursor arithmetic, never across an await.
pub(crate) struct TrackQueue {
    state: Mutex<QueueState>,
    backend: Arc<dyn MediaFetchBackend + Send + Sync>,
    cache: Arc<MetaCache>,
    cache_dir: PathBuf,
}

impl TrackQueue {
    pub(crate) fn new(
        backend: Arc<dyn MediaFetchBackend + Send + Sync>,
        cache: Arc<MetaCache>,
        cache_dir: PathBuf,
    ) -> Self {
        Self {
            state: Mutex::new(QueueState {
                tracks: Vec::new(),
                current_track: 0,
                current_fragment: 0,
                loop_mode: LoopMode::Off,
                generation: 0,
            }),
            backend,
            cache,
            cache_dir,
        }
    }

    /// Resolves the current cursor into a playable fragment file. Waits for
    /// metadata and download as needed; if the cursor moves while waiting,
    /// the wait restarts against the new cursor.
    pub(crate) async fn get(&self) -> Result<Option<PathBuf>, QueueError> {
        loop {
            let (track, track_index, fragment_index, generation) = {
                let state = self.state.lock().unwrap();

                match state.tracks.get(state.current_track) {
                    Some(track) => (
                        Arc::clone(track),
                        state.current_track,
                        state.current_fragment,
                        state.generation,
                    ),
                    None => return Ok(None),
                }
            };

            track.wait_until_ready().await?;

            let fragment = track
                .fragment(fragment_index)
                .ok_or(QueueError::NoPlayableContent)?;

            fragment.wait_until_downloaded().await?;

            {
                let state = self.state.lock().unwrap();

                if state.generation != generation
                    || state.current_track != track_index
                    || state.current_fragment != fragment_index
                {
                    debug!("Queue cursor moved while waiting, restarting");
                    continue;
                }
            }

            self.prefetch_next();

            return Ok(Some(fragment.path().to_path_buf()));
        }
    }

    /// Moves the cursor to the next fragment, honoring the loop mode at item
    /// boundaries. An item with unknown length counts as a single fragment.
    pub(crate) fn advance(&self) {
        let prefetch = {
            let mut state = self.state.lock().unwrap();

            if state.current_track >= state.tracks.len() {
                return;
            }

            let count = state.tracks[state.current_track]
                .fragment_count()
                .unwrap_or(1)
                .max(1);

            if state.current_fragment + 1 < count {
                state.current_fragment += 1;
            } else {
                state.current_fragment = 0;

                match state.loop_mode {
                    LoopMode::Current => (),
                    LoopMode::Off => state.current_track += 1,
                    LoopMode::All => {
                        state.current_track = (state.current_track + 1) % state.tracks.len()
                    }
                }
            }

            state
                .tracks
                .get(state.current_track)
                .map(|track| (Arc::clone(track), state.current_fragment))
        };

        if let Some((track, fragment_index)) = prefetch {
            self.prefetch(track, fragment_index);
        }
    }

    /// User-forced skip. Bypasses the loop mode, saturates past the last
    /// item, and interrupts any in-flight wait on the previous cursor.
    pub(crate) fn skip(&self, count: usize) {
        let mut state = self.state.lock().unwrap();

        if state.tracks.is_empty() {
            return;
        }

        state.current_track = (state.current_track + count).min(state.tracks.len());
        state.current_fragment = 0;
        state.generation += 1;
    }

    /// Queues a URL. Collections are expanded in the background; everything
    /// else is appended immediately as a single unresolved item. Never blocks
    /// on the network.
    pub(crate) fn add(self: &Arc<Self>, url: &str) -> AddOutcome {
        match CollectionLoader::start(
            url,
            Arc::clone(&self.backend),
            Arc::clone(&self.cache),
            self.cache_dir.clone(),
        ) {
            Ok(loader) => {
                actix_rt::spawn({
                    let queue = Arc::clone(self);
                    let url = url.to_string();

                    async move {
                        match loader.wait_until_loaded().await {
                            Ok(tracks) => {
                                let count = tracks.len();
                                queue.state.lock().unwrap().tracks.extend(tracks);
                                info!(url, count, "Collection appended to queue");
                            }
                            Err(error) => {
                                error!(?error, url, "Unable to load collection");
                            }
                        }
                    }
                });

                AddOutcome::LoadingCollection
            }
            // Only NotACollection is reported synchronously.
            Err(_) => {
                let track = Arc::new(Track::new(
                    url.to_string(),
                    Arc::clone(&self.backend),
                    Arc::clone(&self.cache),
                    self.cache_dir.clone(),
                    None,
                ));

                self.state.lock().unwrap().tracks.push(track);

                AddOutcome::QueuedTrack
            }
        }
    }

    pub(crate) fn remove_by_index(&self, index: usize) -> bool {
        let mut state = self.state.lock().unwrap();

        if index >= state.tracks.len() {
            return false;
        }

        state.tracks.remove(index);
        state.generation += 1;

        true
    }

    pub(crate) fn remove_by_url(&self, url: &str) -> bool {
        let mut state = self.state.lock().unwrap();

        let position = state.tracks.iter().position(|track| {
            track.url() == url
                || track
                    .metadata()
                    .map(|metadata| metadata.id.as_str() == url || metadata.url == url)
                    .unwrap_or(false)
        });

        match position {
            Some(index) => {
                state.tracks.remove(index);
                state.generation += 1;
                true
            }
            None => false,
        }
    }

    pub(crate) fn clear(&self) {
        let mut state = self.state.lock().unwrap();

        state.tracks.clear();
        state.current_track = 0;
        state.current_fragment = 0;
        state.generation += 1;
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.state.lock().unwrap().tracks.is_empty()
    }

    pub(crate) fn loop_mode(&self) -> LoopMode {
        self.state.lock().unwrap().loop_mode
    }

    pub(crate) fn set_loop_mode(&self, mode: LoopMode) {
        self.state.lock().unwrap().loop_mode = mode;
    }

    pub(crate) fn cycle_loop_mode(&self) -> LoopMode {
        let mut state = self.state.lock().unwrap();
        state.loop_mode = state.loop_mode.cycled();

        state.loop_mode
    }

    /// Snapshot of resolved items plus a count of items whose metadata is
    /// still being fetched.
    pub(crate) fn resolved_entries(&self) -> QueueSnapshot {
        let state = self.state.lock().unwrap();

        let mut entries = Vec::new();
        let mut pending_count = 0;

        for (index, track) in state.tracks.iter().enumerate() {
            match track.metadata() {
                Some(metadata) => entries.push(QueueEntry { index, metadata }),
                None => pending_count += 1,
            }
        }

        QueueSnapshot {
            entries,
            pending_count,
            current_index: (state.current_track < state.tracks.len())
                .then_some(state.current_track),
        }
    }

    fn prefetch_next(&self) {
        let next = {
            let state = self.state.lock().unwrap();

            state.next_position().and_then(|(track_index, fragment_index)| {
                state
                    .tracks
                    .get(track_index)
                    .map(|track| (Arc::clone(track), fragment_index))
            })
        };

        if let Some((track, fragment_index)) = next {
            self.prefetch(track, fragment_index);
        }
    }

    fn prefetch(&self, track: Arc<Track>, fragment_index: usize) {
        actix_rt::spawn(async move {
            if let Err(error) = track.wait_until_ready().await {
                debug!(?error, "Prefetch skipped, item failed to resolve");
                return;
            }

            if let Some(fragment) = track.fragment(fragment_index) {
                fragment.start_download();
            }
        });
    }
}
