use serde::Deserialize;

/// Subset of the JSON document emitted by `yt-dlp -J` for a single media item.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoInfo {
    pub id: String,
    #[serde(default)]
    pub webpage_url: Option<String>,
    #[serde(default)]
    pub original_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    pub title: String,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub channel_url: Option<String>,
    #[serde(default)]
    pub uploader_url: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
}

impl VideoInfo {
    pub fn best_url(&self) -> Option<&str> {
        self.webpage_url
            .as_deref()
            .or(self.original_url.as_deref())
            .or(self.url.as_deref())
    }

    pub fn best_channel_name(&self) -> Option<&str> {
        self.channel.as_deref().or(self.uploader.as_deref())
    }

    pub fn best_channel_url(&self) -> Option<&str> {
        self.channel_url.as_deref().or(self.uploader_url.as_deref())
    }
}

/// Subset of the JSON document emitted by `yt-dlp -J --flat-playlist`.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistInfo {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub entries: Vec<VideoInfo>,
}
