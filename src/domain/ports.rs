use crate::domain::recipe::RecipeRegistry;
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Byte storage addressed by paths relative to a root.
pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = bool> + Send;
    fn remove_file(&self, path: &str) -> impl std::future::Future<Output = Result<()>> + Send;
    /// Names of the entries directly under the root, sorted.
    fn list_files(&self) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
}

/// Retrieves a remote file into a local destination.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Returns the number of bytes written to `dest`.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64>;
}

/// Indexable collection of samples.
pub trait Samples {
    type Item;

    fn sample_count(&self) -> usize;

    /// `index` is already bounds-checked by the caller.
    fn sample(&self, index: usize) -> Result<Self::Item>;
}

/// Everything a managed dataset needs to know about one remote dataset.
pub trait DatasetSource: Send + Sync {
    type Data: Serialize + DeserializeOwned + Samples + Send + Sync;

    /// Base name for all cache files of this dataset.
    fn name(&self) -> &str;
    /// Project the dataset belongs to; selects the cache sub-directory.
    fn module(&self) -> &str;
    fn url(&self) -> &str;

    fn description(&self) -> Option<&str> {
        None
    }

    /// Turns the downloaded raw file into the in-memory representation.
    fn process_raw_data(&self, raw_path: &Path) -> Result<Self::Data>;

    fn recipes(&self) -> RecipeRegistry<Self::Data> {
        RecipeRegistry::new()
    }
}

/// A dataset whose samples can be accessed by index once set up.
#[async_trait]
pub trait Dataset: Send + Sync {
    type Item;

    /// Makes the data accessible to [`Dataset::get`]: downloading, unpacking or loading
    /// into memory as needed.
    async fn setup(&mut self) -> Result<()>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, index: usize) -> Result<Self::Item>;
}
