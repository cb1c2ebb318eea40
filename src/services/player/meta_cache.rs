use crate::services::player::{CollectionMember, TrackMetadata};
use crate::storage::CacheStorage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::warn;
use url::Url;

/// Cache key of a media URL. A collection identifier takes precedence over a
/// single-item identifier; URLs carrying neither are not cacheable.
pub(crate) fn media_identity(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;

    let mut item_id = None;
    let mut collection_id = None;

    for (key, value) in parsed.query_pairs() {
        match key.as_ref() {
            "list" => collection_id = Some(value.to_string()),
            "v" => item_id = Some(value.to_string()),
            _ => (),
        }
    }

    collection_id.or(item_id)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub(crate) enum CachedEntry {
    Track(TrackMetadata),
    Collection(Vec<CollectionMember>),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheDocument {
    entries: HashMap<String, CachedEntry>,
}

/// In-memory metadata cache backed by a persisted JSON document. Entries are
/// never evicted; every write rewrites the whole document.
pub(crate) struct MetaCache {
    entries: Mutex<HashMap<String, CachedEntry>>,
    storage: Arc<dyn CacheStorage + Send + Sync>,
}

impl MetaCache {
    pub(crate) async fn create(storage: Arc<dyn CacheStorage + Send + Sync>) -> Self {
        let entries = match storage.load().await {
            Ok(Some(document)) => match serde_json::from_str::<CacheDocument>(&document) {
                Ok(document) => document.entries,
                Err(error) => {
                    warn!(?error, "Unable to parse cache document, starting empty");
                    HashMap::new()
                }
            },
            Ok(None) => {
                let empty = serde_json::to_string(&CacheDocument::default())
                    .expect("Unable to serialize empty cache document");

                if let Err(error) = storage.persist(&empty).await {
                    warn!(?error, "Unable to initialize cache document");
                }

                HashMap::new()
            }
            Err(error) => {
                warn!(?error, "Unable to load cache document, starting empty");
                HashMap::new()
            }
        };

        Self {
            entries: Mutex::new(entries),
            storage,
        }
    }

    pub(crate) fn get(&self, url: &str) -> Option<CachedEntry> {
        let key = media_identity(url)?;

        self.entries.lock().unwrap().get(&key).cloned()
    }

    /// Stores the entry and rewrites the persisted document. Persistence
    /// failures are logged and do not fail the caller.
    pub(crate) async fn set(&self, url: &str, entry: CachedEntry) {
        let Some(key) = media_identity(url) else {
            return;
        };

        let document = {
            let mut entries = self.entries.lock().unwrap();
            entries.insert(key, entry);

            serde_json::to_string(&CacheDocument {
                entries: entries.clone(),
            })
            .expect("Unable to serialize cache document")
        };

        if let Err(error) = self.storage.persist(&document).await {
            warn!(?error, "Unable to persist cache document");
        }
    }
}
