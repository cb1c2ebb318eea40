use crate::services::player::{
    AudioBackend, MediaFetchBackend, MetaCache, PlaybackController, TrackQueue,
};
use crate::types::ChannelId;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Lazily constructed playback controller per channel, all sharing one
/// metadata cache and fetch backend.
pub(crate) struct PlayerRegistry {
    controllers: Mutex<HashMap<ChannelId, Arc<PlaybackController>>>,
    backend: Arc<dyn MediaFetchBackend + Send + Sync>,
    audio_backend: Arc<dyn AudioBackend + Send + Sync>,
    cache: Arc<MetaCache>,
    cache_dir: PathBuf,
}

impl PlayerRegistry {
    pub(crate) fn new(
        backend: Arc<dyn MediaFetchBackend + Send + Sync>,
        audio_backend: Arc<dyn AudioBackend + Send + Sync>,
        cache: Arc<MetaCache>,
        cache_dir: PathBuf,
    ) -> Self {
        Self {
            controllers: Mutex::new(HashMap::new()),
            backend,
            audio_backend,
            cache,
            cache_dir,
        }
    }

    pub(crate) fn controller(&self, channel_id: ChannelId) -> Arc<PlaybackController> {
        let mut controllers = self.controllers.lock().unwrap();

        Arc::clone(controllers.entry(channel_id).or_insert_with(|| {
            debug!(%channel_id, "Creating playback controller");

            let queue = Arc::new(TrackQueue::new(
                Arc::clone(&self.backend),
                Arc::clone(&self.cache),
                self.cache_dir.clone(),
            ));

            Arc::new(PlaybackController::new(
                channel_id,
                queue,
                Arc::clone(&self.audio_backend),
            ))
        }))
    }
}
