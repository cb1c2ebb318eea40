use serde::Deserialize;

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_shutdown_timeout() -> u64 {
    30u64
}

fn default_cache_dir() -> String {
    "./cache".to_string()
}

fn default_ytdlp_binary() -> String {
    "yt-dlp".to_string()
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct Config {
    #[serde(default = "default_bind_address")]
    pub(crate) bind_address: String,
    #[serde(default = "default_shutdown_timeout")]
    pub(crate) shutdown_timeout: u64,
    #[serde(rename = "bot_cache_dir", default = "default_cache_dir")]
    pub(crate) cache_dir: String,
    #[serde(default = "default_ytdlp_binary")]
    pub(crate) ytdlp_binary: String,
}

impl Config {
    pub(crate) fn from_env() -> Self {
        match envy::from_env::<Self>() {
            Ok(config) => config,
            Err(error) => panic!("Missing environment variable: {:#?}", error),
        }
    }
}
