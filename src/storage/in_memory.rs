use crate::storage::{CacheStorage, StorageError};
use async_trait::async_trait;
use std::sync::Mutex;

pub(crate) struct InMemoryStorage {
    document: Mutex<Option<String>>,
}

impl InMemoryStorage {
    pub(crate) fn new() -> Self {
        Self {
            document: Mutex::new(None),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_document(document: impl Into<String>) -> Self {
        Self {
            document: Mutex::new(Some(document.into())),
        }
    }
}

#[async_trait]
impl CacheStorage for InMemoryStorage {
    async fn load(&self) -> Result<Option<String>, StorageError> {
        Ok(self.document.lock().unwrap().clone())
    }

    async fn persist(&self, document: &str) -> Result<(), StorageError> {
        *self.document.lock().unwrap() = Some(document.to_string());

        Ok(())
    }
}
