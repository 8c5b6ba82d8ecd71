use crate::core::table::Table;
use crate::domain::model::RecipeArgs;
use crate::domain::ports::DatasetSource;
use crate::domain::recipe::RecipeRegistry;
use crate::utils::error::Result;
use std::path::Path;

/// A delimited text file (CSV, TSV, semicolon separated) loaded as a [`Table`].
#[derive(Clone)]
pub struct CsvSource {
    name: String,
    module: String,
    url: String,
    description: Option<String>,
    delimiter: u8,
    recipes: RecipeRegistry<Table>,
}

impl CsvSource {
    pub fn new(name: &str, module: &str, url: &str) -> Self {
        Self {
            name: name.to_lowercase(),
            module: module.to_lowercase(),
            url: url.to_string(),
            description: None,
            delimiter: b',',
            recipes: Table::builtin_recipes(),
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a dataset-specific recipe next to the built-in table recipes.
    pub fn register_recipe<F>(&mut self, name: &str, recipe: F) -> Result<&mut Self>
    where
        F: Fn(Table, &RecipeArgs) -> Result<Table> + Send + Sync + 'static,
    {
        self.recipes.register(name, recipe)?;
        Ok(self)
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }
}

impl DatasetSource for CsvSource {
    type Data = Table;

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

    fn process_raw_data(&self, raw_path: &Path) -> Result<Table> {
        Table::from_path(raw_path, self.delimiter)
    }

    fn recipes(&self) -> RecipeRegistry<Table> {
        self.recipes.clone()
    }
}
