use crate::services::player::{
    Fragment, MediaFetchBackend, MetaCache, ResolveError, TrackMeta, TrackMetadata,
};
use crate::services::TaskHandle;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

/// Nominal fragment length in seconds.
pub(crate) const FRAGMENT_SIZE: u64 = 200;

/// One queued media item. Fragments come into existence exactly once, after
/// metadata resolution; until then the item has no known length.
pub(crate) struct Track {
    meta: Arc<TrackMeta>,
    fragments: Arc<OnceLock<Vec<Arc<Fragment>>>>,
    ready: TaskHandle<(), ResolveError>,
}

impl Track {
    pub(crate) fn new(
        url: String,
        backend: Arc<dyn MediaFetchBackend + Send + Sync>,
        cache: Arc<MetaCache>,
        cache_dir: PathBuf,
        injected: Option<TrackMetadata>,
    ) -> Self {
        let meta = Arc::new(TrackMeta::resolve(
            url,
            Arc::clone(&backend),
            cache,
            injected,
        ));
        let fragments = Arc::new(OnceLock::new());

        let ready = TaskHandle::spawn({
            let meta = Arc::clone(&meta);
            let fragments = Arc::clone(&fragments);

            async move {
                let metadata = meta.wait_until_fetched().await?;

                let built = slice_into_fragments(metadata.duration)
                    .into_iter()
                    .enumerate()
                    .map(|(fid, (start, end))| {
                        Arc::new(Fragment::new(
                            fid,
                            start,
                            end,
                            Arc::clone(&metadata),
                            Arc::clone(&backend),
                            &cache_dir,
                        ))
                    })
                    .collect();

                let _ = fragments.set(built);

                Ok(())
            }
        });

        Self {
            meta,
            fragments,
            ready,
        }
    }

    pub(crate) fn url(&self) -> &str {
        self.meta.url()
    }

    pub(crate) async fn wait_until_ready(&self) -> Result<(), ResolveError> {
        Ok(self.ready.wait().await?)
    }

    pub(crate) fn fragment(&self, index: usize) -> Option<Arc<Fragment>> {
        self.fragments.get().and_then(|all| all.get(index).cloned())
    }

    pub(crate) fn fragment_count(&self) -> Option<usize> {
        self.fragments.get().map(|all| all.len())
    }

    /// Metadata if already resolved, without waiting.
    pub(crate) fn metadata(&self) -> Option<Arc<TrackMetadata>> {
        self.meta.snapshot()
    }
}

/// Splits `[0, duration)` into fragments of nominal size. A trailing chunk
/// shorter than the nominal size is merged into the preceding fragment.
pub(crate) fn slice_into_fragments(duration: u64) -> Vec<(u64, u64)> {
    let mut fragments: Vec<(u64, u64)> = Vec::new();
    let mut start = 0;

    while start < duration {
        let end = (start + FRAGMENT_SIZE).min(duration);

        match fragments.last_mut() {
            Some(last) if end - start < FRAGMENT_SIZE => last.1 = end,
            _ => fragments.push((start, end)),
        }

        start = end;
    }

    fragments
}
