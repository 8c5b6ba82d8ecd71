pub mod archive_source;
pub mod csv_source;

pub use archive_source::ArchiveSource;
pub use csv_source::CsvSource;

use crate::config::catalog::{DatasetEntry, SUPPORTED_FORMATS};
use crate::domain::ports::DatasetSource;
use crate::utils::error::{DatasetError, Result};

/// Source built from a catalog entry, selected by its format.
#[derive(Clone)]
pub enum CatalogSource {
    Table(CsvSource),
    Archive(ArchiveSource),
}

impl CatalogSource {
    pub fn from_entry(entry: &DatasetEntry) -> Result<Self> {
        match entry.file_format().extension() {
            "csv" | "tsv" => {
                let mut source = CsvSource::new(&entry.name, &entry.module, &entry.url)
                    .with_delimiter(entry.delimiter_byte()?);
                if let Some(description) = &entry.description {
                    source = source.with_description(description.clone());
                }
                Ok(Self::Table(source))
            }
            "zip" => {
                let mut source = ArchiveSource::new(&entry.name, &entry.module, &entry.url);
                if let Some(extension) = &entry.extension {
                    source = source.with_extension(extension);
                }
                if let Some(description) = &entry.description {
                    source = source.with_description(description.clone());
                }
                Ok(Self::Archive(source))
            }
            other => Err(DatasetError::InvalidConfigValueError {
                field: format!("datasets.{}.format", entry.name),
                value: other.to_string(),
                reason: format!("Supported formats: {}", SUPPORTED_FORMATS.join(", ")),
            }),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Table(source) => source.name(),
            Self::Archive(source) => source.name(),
        }
    }

    pub fn module(&self) -> &str {
        match self {
            Self::Table(source) => source.module(),
            Self::Archive(source) => source.module(),
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Table(source) => source.description(),
            Self::Archive(source) => source.description(),
        }
    }

    pub fn recipe_names(&self) -> Vec<String> {
        fn owned(names: Vec<&str>) -> Vec<String> {
            names.into_iter().map(str::to_string).collect()
        }
        match self {
            Self::Table(source) => owned(source.recipes().names()),
            Self::Archive(source) => owned(source.recipes().names()),
        }
    }
}
