use crate::core::corpus::TextCorpus;
use crate::core::dataset::files_dirname;
use crate::domain::model::RecipeArgs;
use crate::domain::ports::DatasetSource;
use crate::domain::recipe::RecipeRegistry;
use crate::utils::error::Result;
use std::path::{Path, PathBuf};

/// A zip archive of text files, unpacked next to the raw download.
#[derive(Clone)]
pub struct ArchiveSource {
    name: String,
    module: String,
    url: String,
    description: Option<String>,
    extension: String,
    recipes: RecipeRegistry<TextCorpus>,
}

impl ArchiveSource {
    pub fn new(name: &str, module: &str, url: &str) -> Self {
        Self {
            name: name.to_lowercase(),
            module: module.to_lowercase(),
            url: url.to_string(),
            description: None,
            extension: "txt".to_string(),
            recipes: TextCorpus::builtin_recipes(),
        }
    }

    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = extension.trim_start_matches('.').to_lowercase();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn register_recipe<F>(&mut self, name: &str, recipe: F) -> Result<&mut Self>
    where
        F: Fn(TextCorpus, &RecipeArgs) -> Result<TextCorpus> + Send + Sync + 'static,
    {
        self.recipes.register(name, recipe)?;
        Ok(self)
    }

    /// Directory the archive is unpacked into.
    pub fn extract_dir(&self, raw_path: &Path) -> PathBuf {
        let parent = raw_path.parent().unwrap_or_else(|| Path::new("."));
        parent.join(files_dirname(&self.name))
    }
}

impl DatasetSource for ArchiveSource {
    type Data = TextCorpus;

    fn name(&self) -> &str {
        &self.name
    }

    fn module(&self) -> &str {
        &self.module
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn process_raw_data(&self, raw_path: &Path) -> Result<TextCorpus> {
        TextCorpus::extract_zip(raw_path, &self.extract_dir(raw_path), &self.extension)
    }

    fn recipes(&self) -> RecipeRegistry<TextCorpus> {
        self.recipes.clone()
    }
}
