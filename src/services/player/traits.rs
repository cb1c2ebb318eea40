use crate::services::player::{CollectionMember, TrackMetadata};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub(crate) struct FetchBackendError(Arc<dyn std::error::Error + Send + Sync>);

impl FetchBackendError {
    pub(crate) fn new(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self(Arc::new(error))
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub(crate) struct AudioBackendError(Arc<dyn std::error::Error + Send + Sync>);

impl AudioBackendError {
    pub(crate) fn new(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self(Arc::new(error))
    }
}

/// Source of media metadata and audio data.
#[async_trait]
pub(crate) trait MediaFetchBackend {
    async fn resolve_metadata(&self, url: &str) -> Result<TrackMetadata, FetchBackendError>;

    async fn resolve_collection(
        &self,
        url: &str,
        max_entries: usize,
    ) -> Result<Vec<CollectionMember>, FetchBackendError>;

    /// Downloads the `[start, end)` range of the item into `destination`.
    async fn download_range(
        &self,
        url: &str,
        start: u64,
        end: u64,
        destination: &Path,
    ) -> Result<(), FetchBackendError>;
}

#[async_trait]
pub(crate) trait AudioBackend {
    async fn connect(
        &self,
        target: &str,
    ) -> Result<Arc<dyn AudioSink + Send + Sync>, AudioBackendError>;

    async fn disconnect(&self, target: &str) -> Result<(), AudioBackendError>;
}

#[async_trait]
pub(crate) trait AudioSink {
    /// Starts playback of the file at `path`. Completion is reported through
    /// `notifier`, possibly from a foreign thread.
    async fn play(&self, path: &Path, notifier: SegmentNotifier)
        -> Result<(), AudioBackendError>;

    fn stop(&self);
    fn pause(&self);
    fn resume(&self);
    fn is_playing(&self) -> bool;
    fn is_paused(&self) -> bool;
}

#[derive(Debug)]
pub(crate) enum PlayerEvent {
    SegmentFinished,
}

/// Hands segment completion back to the task owning the play loop. Safe to
/// call from any thread.
#[derive(Clone)]
pub(crate) struct SegmentNotifier {
    sender: mpsc::UnboundedSender<PlayerEvent>,
}

impl SegmentNotifier {
    pub(crate) fn new(sender: mpsc::UnboundedSender<PlayerEvent>) -> Self {
        Self { sender }
    }

    pub(crate) fn segment_finished(&self) {
        let _ = self.sender.send(PlayerEvent::SegmentFinished);
    }
}
