use async_trait::async_trait;

pub(crate) mod in_memory;
pub(crate) mod on_disk;

pub(crate) use in_memory::InMemoryStorage;
pub(crate) use on_disk::OnDiskStorage;

#[derive(Debug, thiserror::Error)]
pub(crate) enum StorageError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

/// Persistence seam for the metadata cache document. The document is an opaque
/// string; callers own its format.
#[async_trait]
pub(crate) trait CacheStorage {
    async fn load(&self) -> Result<Option<String>, StorageError>;
    async fn persist(&self, document: &str) -> Result<(), StorageError>;
}
