use std::{collections::HashMap, time::Duration};

use common::photo::CachedPhoto;
use tokio::{sync::Mutex, time::Instant};

use crate::traits::CacheMethod;

struct CacheEntry {
    photo: CachedPhoto,
    fetched_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Option<Duration>) -> bool {
        ttl.is_some_and(|ttl| self.fetched_at.elapsed() >= ttl)
    }
}

/// Photos keyed by reference, optionally expiring after `ttl`.
///
/// The lock is only held for map operations, never across an upstream call.
pub(crate) struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Option<Duration>,
}

impl MemoryCache {
    pub(crate) fn new(ttl: Option<Duration>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub(crate) fn ttl(&self) -> Option<Duration> {
        self.ttl
    }
}

impl CacheMethod for MemoryCache {
    async fn get_item(&self, cache_key: &str) -> Option<CachedPhoto> {
        let mut entries = self.entries.lock().await;

        let entry = entries.get(cache_key)?;

        if !entry.is_expired(self.ttl) {
            return Some(entry.photo.clone());
        }

        entries.remove(cache_key);

        None
    }

    async fn insert_item(&self, cache_key: &str, photo: CachedPhoto) {
        let entry = CacheEntry {
            photo,
            fetched_at: Instant::now(),
        };

        self.entries.lock().await.insert(cache_key.to_string(), entry);
    }

    async fn item_count(&self) -> usize {
        self.entries.lock().await.len()
    }

    async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();

        entries.retain(|_, entry| !entry.is_expired(self.ttl));

        before - entries.len()
    }
}
