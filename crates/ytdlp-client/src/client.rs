use crate::{PlaylistInfo, VideoInfo};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum YtDlpError {
    #[error("Unable to spawn yt-dlp process: {0}")]
    SpawnError(#[from] std::io::Error),
    #[error("yt-dlp exited with {status}: {stderr}")]
    ProcessFailed { status: String, stderr: String },
    #[error("Unable to parse yt-dlp output: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Thin wrapper around the `yt-dlp` executable. Every call spawns a fresh
/// process; concurrency control is left to the caller.
pub struct YtDlpClient {
    binary: String,
}

impl YtDlpClient {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Probes a single media item, ignoring any playlist context in the URL.
    pub async fn probe(&self, url: &str) -> Result<VideoInfo, YtDlpError> {
        let stdout = self
            .run(&["-J", "--no-playlist", "--quiet", "--no-warnings", url])
            .await?;

        Ok(serde_json::from_slice(&stdout)?)
    }

    /// Lists playlist entries without resolving each of them, capped at `limit`.
    pub async fn playlist(&self, url: &str, limit: usize) -> Result<PlaylistInfo, YtDlpError> {
        let limit = limit.to_string();
        let stdout = self
            .run(&[
                "-J",
                "--flat-playlist",
                "--playlist-end",
                &limit,
                "--quiet",
                "--no-warnings",
                url,
            ])
            .await?;

        Ok(serde_json::from_slice(&stdout)?)
    }

    /// Downloads the `[start, end)` section of the media item into `output`.
    pub async fn download_section(
        &self,
        url: &str,
        start: u64,
        end: u64,
        output: &Path,
    ) -> Result<(), YtDlpError> {
        let section = format!("*{}-{}", start, end);
        let output = output.to_string_lossy();

        self.run(&[
            "--no-playlist",
            "--quiet",
            "--no-warnings",
            "-f",
            "bestaudio/best",
            "--download-sections",
            &section,
            "--force-keyframes-at-cuts",
            "-o",
            &output,
            url,
        ])
        .await?;

        Ok(())
    }

    async fn run(&self, args: &[&str]) -> Result<Vec<u8>, YtDlpError> {
        debug!(binary = %self.binary, ?args, "Spawning yt-dlp");

        let output = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(YtDlpError::ProcessFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }
}
