use crate::services::player::{
    CachedEntry, FetchBackendError, MediaFetchBackend, MetaCache, Track,
};
use crate::services::{TaskError, TaskHandle};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Upper bound on the number of members loaded from one collection.
pub(crate) const COLLECTION_MAX_ENTRIES: usize = 50;

#[derive(Debug, Clone, thiserror::Error)]
pub(crate) enum CollectionError {
    #[error("Not a collection URL: {0}")]
    NotACollection(String),
    #[error(transparent)]
    Backend(#[from] FetchBackendError),
    #[error("Collection task no longer running")]
    Aborted,
}

impl From<TaskError<CollectionError>> for CollectionError {
    fn from(error: TaskError<CollectionError>) -> Self {
        match error {
            TaskError::Failed(error) => error,
            TaskError::Aborted => CollectionError::Aborted,
        }
    }
}

fn is_collection_url(url: &str) -> bool {
    Url::parse(url)
        .map(|parsed| parsed.query_pairs().any(|(key, _)| key == "list"))
        .unwrap_or(false)
}

/// Loads the member list of a collection URL in the background and turns it
/// into queueable items. Members resolved through the collection listing get
/// their metadata injected, so they never hit the network again.
pub(crate) struct CollectionLoader {
    task: TaskHandle<Vec<Arc<Track>>, CollectionError>,
}

impl CollectionLoader {
    pub(crate) fn start(
        url: &str,
        backend: Arc<dyn MediaFetchBackend + Send + Sync>,
        cache: Arc<MetaCache>,
        cache_dir: PathBuf,
    ) -> Result<Self, CollectionError> {
        if !is_collection_url(url) {
            return Err(CollectionError::NotACollection(url.to_string()));
        }

        let task = TaskHandle::spawn({
            let url = url.to_string();

            async move {
                let members = match cache.get(&url) {
                    Some(CachedEntry::Collection(members)) => {
                        debug!(url, "Collection members served from cache");
                        members
                    }
                    _ => {
                        let members = backend
                            .resolve_collection(&url, COLLECTION_MAX_ENTRIES)
                            .await?;
                        cache
                            .set(&url, CachedEntry::Collection(members.clone()))
                            .await;
                        members
                    }
                };

                let tracks = members
                    .into_iter()
                    .map(|member| {
                        Arc::new(Track::new(
                            member.url,
                            Arc::clone(&backend),
                            Arc::clone(&cache),
                            cache_dir.clone(),
                            member.metadata,
                        ))
                    })
                    .collect();

                Ok(tracks)
            }
        });

        Ok(Self { task })
    }

    pub(crate) async fn wait_until_loaded(&self) -> Result<Vec<Arc<Track>>, CollectionError> {
        Ok(self.task.wait().await?)
    }
}
