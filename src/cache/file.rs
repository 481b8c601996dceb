//! Durable cache tier: one JSON file per entry
//!
//! Writes go to a uniquely named temporary file that is then renamed over the
//! target, so concurrent writers to the same key never leave a torn file and
//! the last rename wins.

use super::CacheEntry;
use crate::error::{Error, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

const ENTRY_EXTENSION: &str = "json";

/// Directory-backed entry store
#[derive(Debug, Clone)]
pub struct FileTier {
    dir: PathBuf,
}

impl FileTier {
    /// Open (creating if needed) the cache directory
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            Error::Cache(format!("Cannot create cache directory {}: {}", dir.display(), e))
        })?;
        if !dir.is_dir() {
            return Err(Error::Cache(format!("{} is not a directory", dir.display())));
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.{}", name, ENTRY_EXTENSION))
    }

    /// Live entry for `key`; an expired file is deleted and reported as a miss
    pub async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let path = self.entry_path(key);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let entry: CacheEntry = serde_json::from_str(&content)?;
        if entry.is_expired() {
            debug!(key, "Removing expired cache file");
            self.remove_path(&path).await?;
            return Ok(None);
        }
        Ok(Some(entry))
    }

    pub async fn put(&self, entry: &CacheEntry) -> Result<()> {
        let path = self.entry_path(&entry.key);
        let tmp = self
            .dir
            .join(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));

        let content = serde_json::to_vec(entry)?;
        fs::write(&tmp, content).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Delete an entry; returns whether it existed
    pub async fn remove(&self, key: &str) -> Result<bool> {
        self.remove_path(&self.entry_path(key)).await
    }

    async fn remove_path(&self, path: &Path) -> Result<bool> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn entry_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut dir = fs::read_dir(&self.dir).await?;
        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            if path.extension().is_some_and(|ext| ext == ENTRY_EXTENSION) {
                files.push(path);
            }
        }
        Ok(files)
    }

    /// Delete every expired entry file, returning how many were removed
    ///
    /// Files that cannot be read or parsed are left alone; `get` reports them.
    pub async fn prune_expired(&self) -> Result<usize> {
        let mut removed = 0;
        for path in self.entry_files().await? {
            let Ok(content) = fs::read_to_string(&path).await else {
                continue;
            };
            let Ok(entry) = serde_json::from_str::<CacheEntry>(&content) else {
                continue;
            };
            if entry.is_expired() && self.remove_path(&path).await? {
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(removed, "Pruned expired cache files");
        }
        Ok(removed)
    }

    /// Number of entry files on disk (expired ones included until pruned)
    pub async fn len(&self) -> Result<usize> {
        Ok(self.entry_files().await?.len())
    }

    /// Delete every entry, returning how many were removed
    pub async fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        for path in self.entry_files().await? {
            if self.remove_path(&path).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
