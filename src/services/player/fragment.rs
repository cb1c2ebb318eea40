use crate::services::player::{FetchBackendError, MediaFetchBackend, TrackMetadata};
use crate::services::{TaskError, TaskHandle};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, thiserror::Error)]
pub(crate) enum DownloadError {
    #[error(transparent)]
    Backend(#[from] FetchBackendError),
    #[error("Unable to store downloaded fragment: {0}")]
    Io(String),
    #[error("Download task no longer running")]
    Aborted,
}

impl From<TaskError<DownloadError>> for DownloadError {
    fn from(error: TaskError<DownloadError>) -> Self {
        match error {
            TaskError::Failed(error) => error,
            TaskError::Aborted => DownloadError::Aborted,
        }
    }
}

/// One downloadable slice of a media item, covering `[start, end)` seconds.
/// The backing file is written once and never deleted here; a failed download
/// is retried from scratch by the next waiter.
pub(crate) struct Fragment {
    fid: usize,
    start: u64,
    end: u64,
    metadata: Arc<TrackMetadata>,
    backend: Arc<dyn MediaFetchBackend + Send + Sync>,
    path: PathBuf,
    download: Mutex<Option<TaskHandle<(), DownloadError>>>,
}

impl Fragment {
    pub(crate) fn new(
        fid: usize,
        start: u64,
        end: u64,
        metadata: Arc<TrackMetadata>,
        backend: Arc<dyn MediaFetchBackend + Send + Sync>,
        cache_dir: &Path,
    ) -> Self {
        let path = metadata.fragment_dir(cache_dir).join(fid.to_string());

        Self {
            fid,
            start,
            end,
            metadata,
            backend,
            path,
            download: Mutex::new(None),
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn is_downloaded(&self) -> bool {
        self.path.exists()
    }

    /// Starts the download in the background unless it is already running or
    /// the fragment file is already in place.
    pub(crate) fn start_download(&self) {
        let _ = self.ensure_download();
    }

    pub(crate) async fn wait_until_downloaded(&self) -> Result<(), DownloadError> {
        Ok(self.ensure_download().wait().await?)
    }

    fn ensure_download(&self) -> TaskHandle<(), DownloadError> {
        let mut download = self.download.lock().unwrap();

        if let Some(task) = download.as_ref() {
            match task.result() {
                None => return task.clone(),
                Some(Ok(())) if self.is_downloaded() => return task.clone(),
                Some(_) => (),
            }
        }

        let task = TaskHandle::spawn({
            let fid = self.fid;
            let start = self.start;
            let end = self.end;
            let url = self.metadata.url.clone();
            let path = self.path.clone();
            let backend = Arc::clone(&self.backend);

            async move {
                if path.exists() {
                    return Ok(());
                }

                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|error| DownloadError::Io(error.to_string()))?;
                }

                debug!(url, fid, start, end, "Downloading fragment");

                // Download into a temp file and rename, so a file at the
                // final path is always complete.
                let temp_path =
                    path.with_file_name(format!("{}.{}.part", fid, Uuid::new_v4()));

                backend.download_range(&url, start, end, &temp_path).await?;

                tokio::fs::rename(&temp_path, &path)
                    .await
                    .map_err(|error| DownloadError::Io(error.to_string()))?;

                Ok(())
            }
        });

        *download = Some(task.clone());

        task
    }
}
