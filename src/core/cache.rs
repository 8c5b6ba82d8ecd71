use crate::adapters::LocalStorage;
use crate::domain::ports::Storage;
use crate::utils::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// JSON documents cached under one directory.
///
/// Every dataset of a module shares the same cache directory; file names are
/// prefixed with the dataset name by the caller.
#[derive(Debug, Clone)]
pub struct CacheStore<S: Storage = LocalStorage> {
    storage: S,
    root: PathBuf,
}

impl CacheStore<LocalStorage> {
    /// Opens a local cache at `root`, creating the directory if needed.
    pub fn local(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            storage: LocalStorage::new(root.clone()),
            root,
        })
    }
}

impl<S: Storage> CacheStore<S> {
    pub fn new(storage: S, root: impl Into<PathBuf>) -> Self {
        Self {
            storage,
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cache_path(&self, fname: &str) -> PathBuf {
        self.root.join(fname)
    }

    pub async fn has_cache(&self, fname: &str) -> bool {
        self.storage.exists(fname).await
    }

    pub async fn load_cache<T: DeserializeOwned>(&self, fname: &str) -> Result<T> {
        let bytes = self.storage.read_file(fname).await?;
        tracing::debug!("📂 Loaded {} ({} bytes) from cache", fname, bytes.len());
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn save_cache<T: Serialize + ?Sized>(&self, data: &T, fname: &str) -> Result<()> {
        let bytes = serde_json::to_vec(data)?;
        tracing::debug!("💾 Saving {} ({} bytes) to cache", fname, bytes.len());
        self.storage.write_file(fname, &bytes).await
    }

    pub async fn remove(&self, fname: &str) -> Result<()> {
        self.storage.remove_file(fname).await
    }

    pub async fn entries(&self) -> Result<Vec<String>> {
        self.storage.list_files().await
    }

    /// Removes every entry accepted by `matches` and returns the removed names.
    pub async fn clear_where<F>(&self, matches: F) -> Result<Vec<String>>
    where
        F: Fn(&str) -> bool + Send + Sync,
    {
        let mut removed = Vec::new();
        for name in self.entries().await? {
            if matches(&name) {
                self.remove(&name).await?;
                removed.push(name);
            }
        }
        Ok(removed)
    }

    pub async fn clear(&self) -> Result<Vec<String>> {
        self.clear_where(|_| true).await
    }
}
