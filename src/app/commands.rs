use crate::adapters::{HttpDownloader, LocalStorage};
use crate::app::sources::CatalogSource;
use crate::config::catalog::{CatalogConfig, DatasetEntry};
use crate::config::cli::{self, Cli, Command, DEFAULT_CATALOG};
use crate::core::cache::CacheStore;
use crate::core::dataset::{belongs_to, processed_filename, raw_filename, ManagedDataset};
use crate::core::hashing::{hash_configuration, HashMethod};
use crate::domain::model::DatasetOptions;
use crate::domain::ports::{Dataset, DatasetSource, Fetcher, Storage};
use crate::utils::error::{DatasetError, Result};
use crate::utils::monitor::ResourceMonitor;
use crate::utils::validation::Validate;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Runs the parsed command line and returns the text to print.
pub async fn run(cli: &Cli) -> Result<String> {
    if let Command::Hash { file, method } = &cli.command {
        return hash_file(file, method.parse()?);
    }
    let context = CommandContext::from_cli(cli)?;
    context.execute(&cli.command).await
}

/// Reads the catalog at `path`, or `datasets.toml` in the working directory when present.
pub fn load_catalog(path: Option<&Path>) -> Result<CatalogConfig> {
    match path {
        Some(path) if !path.is_file() => Err(DatasetError::FileNotFound {
            path: path.display().to_string(),
        }),
        Some(path) => CatalogConfig::from_file(path),
        None if Path::new(DEFAULT_CATALOG).is_file() => CatalogConfig::from_file(DEFAULT_CATALOG),
        None => {
            tracing::debug!("No catalog found, using an empty one");
            Ok(CatalogConfig::default())
        }
    }
}

/// Hashes a JSON or TOML configuration file (chosen by extension, JSON otherwise).
pub fn hash_file(path: &Path, method: HashMethod) -> Result<String> {
    if !path.is_file() {
        return Err(DatasetError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    let is_toml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("toml"));

    let digest = if is_toml {
        let value: toml::Value = toml::from_str(&content)?;
        hash_configuration(&value, method)?
    } else {
        let value: serde_json::Value = serde_json::from_str(&content)?;
        hash_configuration(&value, method)?
    };
    Ok(format!("{}  {}", digest, path.display()))
}

pub struct CommandContext {
    catalog: CatalogConfig,
    cache_root: PathBuf,
    fetcher: Arc<dyn Fetcher>,
    monitor: ResourceMonitor,
}

impl CommandContext {
    pub fn new(
        catalog: CatalogConfig,
        cache_root: impl Into<PathBuf>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            catalog,
            cache_root: cache_root.into(),
            fetcher,
            monitor: ResourceMonitor::default(),
        }
    }

    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let catalog = load_catalog(cli.catalog.as_deref())?;
        catalog.validate()?;

        let cache_root = catalog.cache_root(cli.cache_root.as_deref());
        tracing::debug!("Cache root: {}", cache_root.display());
        let fetcher = Arc::new(HttpDownloader::new(catalog.download_settings())?);

        Ok(Self::new(catalog, cache_root, fetcher).with_monitor(ResourceMonitor::new(cli.monitor)))
    }

    pub fn with_monitor(mut self, monitor: ResourceMonitor) -> Self {
        if monitor.is_enabled() {
            tracing::info!("🔍 System monitoring enabled");
        }
        self.monitor = monitor;
        self
    }

    pub fn monitor(&self) -> &ResourceMonitor {
        &self.monitor
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    pub async fn execute(&self, command: &Command) -> Result<String> {
        match command {
            Command::List => self.list(),
            Command::Info { name } => self.info(name).await,
            Command::Fetch {
                name,
                recipe,
                args,
                path,
                force_download,
                force_process,
            } => {
                let mut options = DatasetOptions::default()
                    .with_cache_root(&self.cache_root)
                    .force_download(*force_download)
                    .force_process(*force_process);
                options.recipe = recipe.clone();
                options.recipe_args = cli::recipe_args(args);
                options.path = path.clone();
                self.fetch(name, options).await
            }
            Command::Recipes { name } => self.recipes(name),
            Command::Hash { file, method } => hash_file(file, method.parse()?),
            Command::Clean { name } => self.clean(name.as_deref()).await,
        }
    }

    fn module_dir(&self, entry: &DatasetEntry) -> PathBuf {
        self.cache_root.join(entry.module.to_lowercase())
    }

    fn cache_status(&self, entry: &DatasetEntry) -> &'static str {
        let dir = self.module_dir(entry);
        let name = entry.name.to_lowercase();
        if dir.join(processed_filename(&name)).is_file() {
            "processed"
        } else if dir.join(raw_filename(&name)).is_file() {
            "downloaded"
        } else {
            "not cached"
        }
    }

    pub fn list(&self) -> Result<String> {
        if self.catalog.datasets.is_empty() {
            return Ok("No datasets in catalog".to_string());
        }
        let lines: Vec<String> = self
            .catalog
            .datasets
            .iter()
            .map(|entry| {
                format!(
                    "{:<20} {:<24} {:<6} {}",
                    entry.name.to_lowercase(),
                    entry.module.to_lowercase(),
                    entry.file_format().extension(),
                    self.cache_status(entry)
                )
            })
            .collect();
        Ok(lines.join("\n"))
    }

    pub async fn info(&self, name: &str) -> Result<String> {
        let entry = self.catalog.find(name)?;
        let source = CatalogSource::from_entry(entry)?;
        let dir = self.module_dir(entry);

        let mut lines = vec![format!("Dataset(\"{}\")", source.name())];
        if let Some(description) = source.description() {
            lines.push(description.to_string());
        }
        lines.push(format!("module: {}", source.module()));
        lines.push(format!("url:    {}", entry.url));
        lines.push(format!("format: {}", entry.file_format()));
        lines.push(format!("cache:  {} ({})", dir.display(), self.cache_status(entry)));

        let recipe_names = source.recipe_names();
        let recipes: Vec<&str> = recipe_names.iter().map(String::as_str).collect();
        let storage = LocalStorage::new(&dir);
        for fname in storage.list_files().await? {
            if !belongs_to(source.name(), &recipes, &fname) {
                continue;
            }
            let metadata = std::fs::metadata(dir.join(&fname))?;
            let modified = metadata
                .modified()
                .map(|t| DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|_| "-".to_string());
            lines.push(format!("  {:<40} {:>12} bytes  {}", fname, metadata.len(), modified));
        }
        Ok(lines.join("\n"))
    }

    pub async fn fetch(&self, name: &str, options: DatasetOptions) -> Result<String> {
        let entry = self.catalog.find(name)?;
        match CatalogSource::from_entry(entry)? {
            CatalogSource::Table(source) => self.open_and_report(source, options).await,
            CatalogSource::Archive(source) => self.open_and_report(source, options).await,
        }
    }

    async fn open_and_report<S: DatasetSource>(
        &self,
        source: S,
        options: DatasetOptions,
    ) -> Result<String> {
        let mut dataset = ManagedDataset::prepare(source, options, Arc::clone(&self.fetcher))?;
        self.monitor.checkpoint("resolve");
        dataset.ensure_raw().await?;
        self.monitor.checkpoint("download");
        dataset.setup().await?;
        self.monitor.checkpoint("process");
        self.monitor.log_summary();

        let mut report = format!("{}\n{} samples", dataset, dataset.len());
        if let Some(fname) = dataset.current_recipe_filename()? {
            let path = dataset.cache_dir().join(fname);
            report.push_str(&format!("\nrecipe output: {}", path.display()));
        }
        Ok(report)
    }

    pub fn recipes(&self, name: &str) -> Result<String> {
        let entry = self.catalog.find(name)?;
        let names = CatalogSource::from_entry(entry)?.recipe_names();
        if names.is_empty() {
            return Ok(format!("No recipes for {}", entry.name.to_lowercase()));
        }
        Ok(names.join("\n"))
    }

    /// Removes cached files of `name`, or of every catalog dataset.
    pub async fn clean(&self, name: Option<&str>) -> Result<String> {
        let entries: Vec<&DatasetEntry> = match name {
            Some(name) => vec![self.catalog.find(name)?],
            None => self.catalog.datasets.iter().collect(),
        };

        let mut removed = 0;
        for entry in entries {
            let dir = self.module_dir(entry);
            if !dir.is_dir() {
                continue;
            }
            let dataset_name = entry.name.to_lowercase();
            let recipe_names = CatalogSource::from_entry(entry)?.recipe_names();
            let recipes: Vec<&str> = recipe_names.iter().map(String::as_str).collect();
            let cleared = CacheStore::local(&dir)?
                .clear_where(|fname| belongs_to(&dataset_name, &recipes, fname))
                .await?;
            tracing::info!("🧹 Removed {} cache entries of {}", cleared.len(), dataset_name);
            removed += cleared.len();
        }
        Ok(format!("Removed {} cache entries", removed))
    }
}
