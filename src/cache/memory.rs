//! In-process cache tier

use super::CacheEntry;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Map of live entries; expired entries are removed when read or on the next insert
#[derive(Debug, Default)]
pub struct MemoryTier {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryTier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired() => return Some(entry.clone()),
                Some(_) => {}
            }
        }

        // Expired: re-check under the write lock, a writer may have refreshed it
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some(entry) if !entry.is_expired() => Some(entry.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub async fn insert(&self, entry: CacheEntry) {
        let mut entries = self.entries.write().await;
        entries.retain(|_, e| !e.is_expired());
        entries.insert(entry.key.clone(), entry);
    }

    pub async fn remove(&self, key: &str) -> bool {
        self.entries.write().await.remove(key).is_some()
    }

    /// Drop every entry, returning how many there were
    pub async fn clear(&self) -> usize {
        let mut entries = self.entries.write().await;
        let count = entries.len();
        entries.clear();
        count
    }

    /// Entries currently held, including any not yet found expired
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
