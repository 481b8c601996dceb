//! Content-addressed result cache
//!
//! Aggregation results are keyed by a fingerprint of the image bytes and the
//! request parameters that change the output. Lookups check the in-process
//! tier first and then the durable tier; a durable hit is promoted into
//! memory. Durable-tier failures are logged and treated as misses.

pub mod file;
pub mod memory;

pub use file::FileTier;
pub use memory::MemoryTier;

use crate::config::Config;
use crate::constants::cache::{
    DURABLE_PRUNE_INTERVAL, FINGERPRINT_HEX_LEN, FINGERPRINT_PREFIX, RESULT_TTL_SECS,
};
use crate::hypothesis::{AggregationResult, ProcessingMode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// SHA-256 hex digest of the image bytes
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Cache key for an image hash and the parameters that affect the result
pub fn fingerprint(content_hash: &str, mode: ProcessingMode, min_confidence: f64) -> String {
    let material = format!("{}_{}_{}", content_hash, mode, min_confidence);
    let digest = hex::encode(Sha256::digest(material.as_bytes()));
    format!("{}:{}", FINGERPRINT_PREFIX, &digest[..FINGERPRINT_HEX_LEN])
}

/// A cached result and its expiry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub value: AggregationResult,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(key: impl Into<String>, value: AggregationResult, ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let expires_at = Utc::now()
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            key: key.into(),
            value,
            expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Cache occupancy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub memory_entries: usize,
    /// `"file"` or `"none"`
    pub durable_backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub durable_dir: Option<PathBuf>,
    /// `None` when there is no durable tier or it could not be read
    pub durable_entries: Option<usize>,
}

/// Two-tier result cache
#[derive(Debug)]
pub struct ResultCache {
    memory: MemoryTier,
    durable: Option<FileTier>,
    default_ttl: Duration,
    writes: AtomicUsize,
}

impl ResultCache {
    /// Cache with no durable tier
    pub fn memory_only(default_ttl: Duration) -> Self {
        Self {
            memory: MemoryTier::new(),
            durable: None,
            default_ttl,
            writes: AtomicUsize::new(0),
        }
    }

    /// Cache persisting to `dir`; falls back to memory-only if it cannot be opened
    pub fn with_durable_dir(dir: impl Into<PathBuf>, default_ttl: Duration) -> Self {
        let durable = match FileTier::open(dir) {
            Ok(tier) => {
                info!(dir = %tier.dir().display(), "Durable result cache enabled");
                Some(tier)
            }
            Err(e) => {
                warn!(error = %e, "Durable result cache unavailable, using memory only");
                None
            }
        };
        Self {
            memory: MemoryTier::new(),
            durable,
            default_ttl,
            writes: AtomicUsize::new(0),
        }
    }

    /// Cache configured from `[cache]`
    pub fn from_config(config: &Config) -> Self {
        if !config.cache.durable {
            return Self::memory_only(config.cache_ttl());
        }
        match config.cache_dir() {
            Ok(dir) => Self::with_durable_dir(dir, config.cache_ttl()),
            Err(e) => {
                warn!(error = %e, "No cache directory, using memory only");
                Self::memory_only(config.cache_ttl())
            }
        }
    }

    pub fn has_durable(&self) -> bool {
        self.durable.is_some()
    }

    pub async fn get(&self, key: &str) -> Option<AggregationResult> {
        if let Some(entry) = self.memory.get(key).await {
            debug!(key, tier = "memory", "Cache hit");
            return Some(entry.value);
        }

        let durable = self.durable.as_ref()?;
        match durable.get(key).await {
            Ok(Some(entry)) => {
                debug!(key, tier = "file", "Cache hit");
                let value = entry.value.clone();
                self.memory.insert(entry).await;
                Some(value)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(key, error = %e, "Durable cache read failed");
                None
            }
        }
    }

    /// Store a result in both tiers
    ///
    /// Returns false only when the durable write failed; the memory tier
    /// always accepts the entry.
    pub async fn set(&self, key: &str, result: &AggregationResult, ttl: Option<Duration>) -> bool {
        let entry = CacheEntry::new(key, result.clone(), ttl.unwrap_or(self.default_ttl));

        let mut stored = true;
        if let Some(durable) = &self.durable {
            if self.writes.fetch_add(1, Ordering::Relaxed) % DURABLE_PRUNE_INTERVAL == 0 {
                if let Err(e) = durable.prune_expired().await {
                    warn!(error = %e, "Durable cache prune failed");
                }
            }
            if let Err(e) = durable.put(&entry).await {
                warn!(key, error = %e, "Durable cache write failed");
                stored = false;
            }
        }
        self.memory.insert(entry).await;
        stored
    }

    /// Remove a key from both tiers; returns whether any tier held it
    pub async fn delete(&self, key: &str) -> bool {
        let mut found = self.memory.remove(key).await;
        if let Some(durable) = &self.durable {
            match durable.remove(key).await {
                Ok(removed) => found |= removed,
                Err(e) => warn!(key, error = %e, "Durable cache delete failed"),
            }
        }
        found
    }

    /// Drop every entry from both tiers, returning the number removed
    pub async fn invalidate_all(&self) -> usize {
        let mut removed = self.memory.clear().await;
        if let Some(durable) = &self.durable {
            match durable.clear().await {
                Ok(n) => removed = removed.max(n),
                Err(e) => warn!(error = %e, "Durable cache clear failed"),
            }
        }
        info!(removed, "Result cache cleared");
        removed
    }

    pub async fn stats(&self) -> CacheStats {
        let memory_entries = self.memory.len().await;
        match &self.durable {
            Some(durable) => CacheStats {
                memory_entries,
                durable_backend: "file".to_string(),
                durable_dir: Some(durable.dir().to_path_buf()),
                durable_entries: durable
                    .len()
                    .await
                    .map_err(|e| warn!(error = %e, "Cannot count durable cache entries"))
                    .ok(),
            },
            None => CacheStats {
                memory_entries,
                durable_backend: "none".to_string(),
                durable_dir: None,
                durable_entries: None,
            },
        }
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::memory_only(Duration::from_secs(RESULT_TTL_SECS))
    }
}
