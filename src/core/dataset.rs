//! Datasets that download, process and cache themselves.
//!
//! A [`ManagedDataset`] keeps three kinds of files in `<cache_root>/<module>/`:
//!
//! * `<name>_raw`: the file as downloaded from the source URL,
//! * `<name>.json`: the output of [`DatasetSource::process_raw_data`],
//! * `<name>_<recipe>[_<hash>].json`: the output of a recipe applied to the processed data.
//!
//! Each level is rebuilt only when missing or explicitly forced.

use crate::adapters::{DownloadSettings, HttpDownloader, LocalStorage};
use crate::core::cache::CacheStore;
use crate::core::hashing::{hash_configuration, HashMethod};
use crate::domain::model::{DatasetOptions, RecipeArgs};
use crate::domain::ports::{Dataset, DatasetSource, Fetcher, Samples};
use crate::domain::recipe::RecipeRegistry;
use crate::utils::error::{DatasetError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const CACHE_ROOT_ENV: &str = "AI4SCR_CACHE_ROOT";

/// Number of hex characters of the argument hash kept in recipe cache file names.
const RECIPE_HASH_LEN: usize = 12;

/// `$AI4SCR_CACHE_ROOT`, or `~/.ai4scr/datasets`.
pub fn default_cache_root() -> PathBuf {
    if let Some(root) = std::env::var_os(CACHE_ROOT_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(root);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".ai4scr")
        .join("datasets")
}

pub fn raw_filename(name: &str) -> String {
    format!("{}_raw", name)
}

pub fn processed_filename(name: &str) -> String {
    format!("{}.json", name)
}

pub fn recipe_filename(name: &str, recipe: &str, args: &RecipeArgs) -> Result<String> {
    if args.is_empty() {
        return Ok(format!("{}_{}.json", name, recipe));
    }
    let hash = hash_configuration(args, HashMethod::Sha256)?;
    Ok(format!("{}_{}_{}.json", name, recipe, &hash[..RECIPE_HASH_LEN]))
}

pub fn files_dirname(name: &str) -> String {
    format!("{}_files", name)
}

/// Whether `fname` is one of the cache entries of dataset `name`.
///
/// Only the dataset's own layout matches: its raw download (and an
/// interrupted `.part`), the processed file, the extraction directory and
/// the outputs of the given recipes. A sibling such as `db_v2` never
/// belongs to `db`.
pub fn belongs_to(name: &str, recipes: &[&str], fname: &str) -> bool {
    let raw = raw_filename(name);
    if fname == raw
        || fname.strip_prefix(raw.as_str()) == Some(".part")
        || fname == processed_filename(name)
        || fname == files_dirname(name)
    {
        return true;
    }

    let Some(stem) = fname
        .strip_prefix(name)
        .and_then(|rest| rest.strip_prefix('_'))
        .and_then(|rest| rest.strip_suffix(".json"))
    else {
        return false;
    };

    recipes.iter().any(|recipe| match stem.strip_prefix(recipe) {
        Some("") => true,
        Some(rest) => rest.strip_prefix('_').is_some_and(is_recipe_hash),
        None => false,
    })
}

fn is_recipe_hash(s: &str) -> bool {
    s.len() == RECIPE_HASH_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// In-memory dataset with download, caching and recipe support.
pub struct ManagedDataset<S: DatasetSource> {
    source: S,
    options: DatasetOptions,
    recipes: RecipeRegistry<S::Data>,
    cache: CacheStore<LocalStorage>,
    fetcher: Arc<dyn Fetcher>,
    raw_path: PathBuf,
    data: Option<S::Data>,
}

impl<S: DatasetSource> std::fmt::Debug for ManagedDataset<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedDataset")
            .field("name", &self.source.name())
            .field("module", &self.source.module())
            .field("raw_path", &self.raw_path)
            .field("recipe", &self.options.recipe)
            .field("loaded", &self.data.is_some())
            .finish()
    }
}

impl<S: DatasetSource> ManagedDataset<S> {
    /// Opens the dataset with the default HTTP downloader.
    pub async fn open(source: S, options: DatasetOptions) -> Result<Self> {
        let fetcher = Arc::new(HttpDownloader::new(DownloadSettings::default())?);
        Self::open_with(source, options, fetcher).await
    }

    /// Resolves cache locations, downloads the raw file if needed and loads the data.
    pub async fn open_with(
        source: S,
        options: DatasetOptions,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self> {
        let mut dataset = Self::prepare(source, options, fetcher)?;
        dataset.ensure_raw().await?;
        dataset.setup().await?;
        Ok(dataset)
    }

    /// Validates options and resolves paths without touching the network.
    pub fn prepare(source: S, options: DatasetOptions, fetcher: Arc<dyn Fetcher>) -> Result<Self> {
        let recipes = source.recipes();
        if let Some(recipe) = &options.recipe {
            recipes.get(recipe)?;
        }

        let cache_root = options.cache_root.clone().unwrap_or_else(default_cache_root);
        let cache = CacheStore::local(cache_root.join(source.module()))?;

        let raw_path = match &options.path {
            Some(path) => {
                if !path.is_file() {
                    return Err(DatasetError::FileNotFound {
                        path: path.display().to_string(),
                    });
                }
                path.clone()
            }
            None => cache.cache_path(&raw_filename(source.name())),
        };

        Ok(Self {
            source,
            options,
            recipes,
            cache,
            fetcher,
            raw_path,
            data: None,
        })
    }

    pub fn name(&self) -> &str {
        self.source.name()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn raw_path(&self) -> &Path {
        &self.raw_path
    }

    pub fn cache_dir(&self) -> &Path {
        self.cache.root()
    }

    pub fn recipes(&self) -> &RecipeRegistry<S::Data> {
        &self.recipes
    }

    pub fn data(&self) -> Option<&S::Data> {
        self.data.as_ref()
    }

    pub fn into_data(self) -> Option<S::Data> {
        self.data
    }

    pub fn has_raw(&self) -> bool {
        self.raw_path.is_file()
    }

    pub async fn has_processed(&self) -> bool {
        self.cache.has_cache(&processed_filename(self.name())).await
    }

    pub fn current_recipe_filename(&self) -> Result<Option<String>> {
        self.options
            .recipe
            .as_deref()
            .map(|recipe| recipe_filename(self.name(), recipe, &self.options.recipe_args))
            .transpose()
    }

    /// Downloads the raw file from the source URL, replacing any previous copy.
    pub async fn download(&self) -> Result<u64> {
        tracing::info!("⬇️  Downloading {} from {}", self.name(), self.source.url());
        self.fetcher.fetch(self.source.url(), &self.raw_path).await
    }

    pub async fn ensure_raw(&self) -> Result<()> {
        if self.options.force_download || !self.has_raw() {
            self.download().await?;
        } else {
            tracing::debug!("Using raw file {}", self.raw_path.display());
        }
        Ok(())
    }

    /// Processed raw data, from cache unless a rebuild is forced.
    pub async fn load_raw_data(&self) -> Result<S::Data> {
        let fname = processed_filename(self.name());
        if self.options.force_download
            || self.options.force_process
            || !self.cache.has_cache(&fname).await
        {
            if !self.has_raw() {
                self.download().await?;
            }
            tracing::info!("⚙️  Processing raw data of {}", self.name());
            let data = self.source.process_raw_data(&self.raw_path)?;
            self.cache.save_cache(&data, &fname).await?;
            Ok(data)
        } else {
            tracing::debug!("Loading processed {} from cache", self.name());
            self.cache.load_cache(&fname).await
        }
    }

    /// Recipe output, from cache unless a rebuild is forced.
    pub async fn load_recipe_data(&self, recipe: &str) -> Result<S::Data> {
        let fname = recipe_filename(self.name(), recipe, &self.options.recipe_args)?;
        if self.options.force_process || !self.cache.has_cache(&fname).await {
            let raw = self.load_raw_data().await?;
            tracing::info!("🍳 Applying recipe '{}' to {}", recipe, self.name());
            let data = self.recipes.apply(recipe, raw, &self.options.recipe_args)?;
            self.cache.save_cache(&data, &fname).await?;
            Ok(data)
        } else {
            tracing::debug!("Loading recipe '{}' of {} from cache", recipe, self.name());
            self.cache.load_cache(&fname).await
        }
    }

    /// Removes every cached file of this dataset, including the raw download.
    pub async fn clear_cache(&self) -> Result<Vec<String>> {
        let name = self.name().to_string();
        let recipes = self.recipes.names();
        self.cache
            .clear_where(|fname| belongs_to(&name, &recipes, fname))
            .await
    }
}

#[async_trait]
impl<S> Dataset for ManagedDataset<S>
where
    S: DatasetSource,
{
    type Item = <S::Data as Samples>::Item;

    async fn setup(&mut self) -> Result<()> {
        let data = match self.options.recipe.clone() {
            Some(recipe) => self.load_recipe_data(&recipe).await?,
            None => self.load_raw_data().await?,
        };
        tracing::info!(
            "📊 {} ready with {} samples",
            self.name(),
            data.sample_count()
        );
        self.data = Some(data);
        Ok(())
    }

    fn len(&self) -> usize {
        self.data.as_ref().map_or(0, |data| data.sample_count())
    }

    fn get(&self, index: usize) -> Result<Self::Item> {
        let len = self.len();
        match &self.data {
            Some(data) if index < len => data.sample(index),
            _ => Err(DatasetError::IndexOutOfRange { index, len }),
        }
    }
}

impl<S: DatasetSource> std::fmt::Display for ManagedDataset<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Dataset(\"{}\")", self.name())?;
        if let Some(description) = self.source.description() {
            writeln!(f, "{}", description)?;
        }
        write!(f, "cached at {}", self.cache.root().display())
    }
}
