use crate::storage::{CacheStorage, StorageError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::create_dir_all;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

pub(crate) struct OnDiskStorage {
    path: PathBuf,
}

impl OnDiskStorage {
    pub(crate) fn create(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CacheStorage for OnDiskStorage {
    async fn load(&self) -> Result<Option<String>, StorageError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(value) => Ok(Some(value)),
            Err(error) if matches!(error.kind(), std::io::ErrorKind::NotFound) => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    async fn persist(&self, document: &str) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            create_dir_all(parent).await?;
        }

        // Full rewrite through a temp file so readers never observe a torn
        // document.
        let temp_path = temp_sibling(&self.path);

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&temp_path)
            .await?;

        file.write_all(document.as_bytes()).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&temp_path, &self.path).await?;

        Ok(())
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();

    path.with_file_name(format!("{}.{}.part", filename, Uuid::new_v4()))
}
