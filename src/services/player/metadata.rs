use crate::services::player::{
    CachedEntry, FetchBackendError, MediaFetchBackend, MetaCache, TrackMetadata,
};
use crate::services::{TaskError, TaskHandle};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, thiserror::Error)]
pub(crate) enum ResolveError {
    #[error(transparent)]
    Backend(#[from] FetchBackendError),
    #[error("Metadata task no longer running")]
    Aborted,
}

impl From<TaskError<ResolveError>> for ResolveError {
    fn from(error: TaskError<ResolveError>) -> Self {
        match error {
            TaskError::Failed(error) => error,
            TaskError::Aborted => ResolveError::Aborted,
        }
    }
}

/// Resolves the metadata of one media URL in the background. The resolved
/// metadata is fixed for the lifetime of the value; failures propagate to
/// every waiter and are not retried.
pub(crate) struct TrackMeta {
    url: String,
    task: TaskHandle<Arc<TrackMetadata>, ResolveError>,
}

impl TrackMeta {
    pub(crate) fn resolve(
        url: String,
        backend: Arc<dyn MediaFetchBackend + Send + Sync>,
        cache: Arc<MetaCache>,
        injected: Option<TrackMetadata>,
    ) -> Self {
        let task = TaskHandle::spawn({
            let url = url.clone();

            async move {
                if let Some(metadata) = injected {
                    return Ok(Arc::new(metadata));
                }

                if let Some(CachedEntry::Track(metadata)) = cache.get(&url) {
                    debug!(url, "Metadata served from cache");
                    return Ok(Arc::new(metadata));
                }

                let metadata = backend.resolve_metadata(&url).await?;
                cache
                    .set(&url, CachedEntry::Track(metadata.clone()))
                    .await;

                Ok(Arc::new(metadata))
            }
        });

        Self { url, task }
    }

    pub(crate) fn url(&self) -> &str {
        &self.url
    }

    pub(crate) async fn wait_until_fetched(&self) -> Result<Arc<TrackMetadata>, ResolveError> {
        Ok(self.task.wait().await?)
    }

    /// Metadata if already resolved, without waiting.
    pub(crate) fn snapshot(&self) -> Option<Arc<TrackMetadata>> {
        self.task.result().and_then(|outcome| outcome.ok())
    }
}
