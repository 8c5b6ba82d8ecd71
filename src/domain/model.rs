use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// One row of tabular data, keyed by column name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub data: HashMap<String, serde_json::Value>,
}

impl Record {
    pub fn get(&self, column: &str) -> Option<&serde_json::Value> {
        self.data.get(column)
    }
}

/// Keyword arguments forwarded to a recipe.
pub type RecipeArgs = serde_json::Map<String, serde_json::Value>;

/// How a dataset should be opened.
#[derive(Debug, Clone, Default)]
pub struct DatasetOptions {
    /// Existing raw file to use instead of `<cache>/<module>/<name>_raw`.
    pub path: Option<PathBuf>,
    pub recipe: Option<String>,
    pub recipe_args: RecipeArgs,
    pub force_download: bool,
    pub force_process: bool,
    /// Overrides the default cache root (`~/.ai4scr/datasets`).
    pub cache_root: Option<PathBuf>,
}

impl DatasetOptions {
    pub fn with_recipe(mut self, recipe: impl Into<String>) -> Self {
        self.recipe = Some(recipe.into());
        self
    }

    pub fn with_recipe_arg(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.recipe_args.insert(key.into(), value);
        self
    }

    pub fn with_cache_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.cache_root = Some(root.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn force_download(mut self, force: bool) -> Self {
        self.force_download = force;
        self
    }

    pub fn force_process(mut self, force: bool) -> Self {
        self.force_process = force;
        self
    }
}

/// File format of a raw dataset file, always with a leading dot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFormat(String);

impl FileFormat {
    pub fn new(format: &str) -> Self {
        let format = format.trim().to_lowercase();
        if format.starts_with('.') {
            Self(format)
        } else {
            Self(format!(".{}", format))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn extension(&self) -> &str {
        &self.0[1..]
    }
}

impl std::fmt::Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
