use crate::types::MediaId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Metadata of a single playable media item, fixed once resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct TrackMetadata {
    pub(crate) id: MediaId,
    pub(crate) url: String,
    pub(crate) title: String,
    pub(crate) channel_name: String,
    pub(crate) channel_url: String,
    pub(crate) duration: u64,
}

impl TrackMetadata {
    /// Directory under which all fragments of this item are stored.
    pub(crate) fn fragment_dir(&self, cache_dir: &Path) -> PathBuf {
        cache_dir.join(self.id.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct CollectionMember {
    pub(crate) url: String,
    #[serde(default)]
    pub(crate) metadata: Option<TrackMetadata>,
}
