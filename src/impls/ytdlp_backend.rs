use crate::services::player::{
    CollectionMember, FetchBackendError, MediaFetchBackend, TrackMetadata,
};
use crate::types::MediaId;
use async_trait::async_trait;
use std::path::Path;
use ytdlp_client::{VideoInfo, YtDlpClient};

#[derive(Debug, thiserror::Error)]
#[error("Media item has no duration: {0}")]
struct MissingDuration(String);

fn metadata_from_info(info: &VideoInfo, requested_url: &str) -> Option<TrackMetadata> {
    let duration = info.duration?;
    let url = info.best_url().unwrap_or(requested_url).to_string();

    Some(TrackMetadata {
        id: MediaId(info.id.clone()),
        channel_name: info.best_channel_name().unwrap_or("Unknown").to_string(),
        channel_url: info.best_channel_url().unwrap_or(&url).to_string(),
        title: info.title.clone(),
        duration: duration.round() as u64,
        url,
    })
}

#[async_trait]
impl MediaFetchBackend for YtDlpClient {
    async fn resolve_metadata(&self, url: &str) -> Result<TrackMetadata, FetchBackendError> {
        let info = self.probe(url).await.map_err(FetchBackendError::new)?;

        metadata_from_info(&info, url)
            .ok_or_else(|| FetchBackendError::new(MissingDuration(url.to_string())))
    }

    async fn resolve_collection(
        &self,
        url: &str,
        max_entries: usize,
    ) -> Result<Vec<CollectionMember>, FetchBackendError> {
        let playlist = self
            .playlist(url, max_entries)
            .await
            .map_err(FetchBackendError::new)?;

        let members = playlist
            .entries
            .iter()
            .take(max_entries)
            .filter_map(|entry| {
                let member_url = entry.best_url()?.to_string();

                Some(CollectionMember {
                    metadata: metadata_from_info(entry, &member_url),
                    url: member_url,
                })
            })
            .collect();

        Ok(members)
    }

    async fn download_range(
        &self,
        url: &str,
        start: u64,
        end: u64,
        destination: &Path,
    ) -> Result<(), FetchBackendError> {
        self.download_section(url, start, end, destination)
            .await
            .map_err(FetchBackendError::new)
    }
}
