//! Utilities to harmonise data workflows: self-caching datasets with recipes,
//! configuration hashing, and a `dataset` command line tool.

pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use crate::core::{dataset, hashing};

pub use adapters::{DownloadSettings, HttpDownloader, LocalStorage};
pub use app::sources::{ArchiveSource, CatalogSource, CsvSource};
pub use config::{CatalogConfig, DatasetEntry};
pub use crate::core::cache::CacheStore;
pub use crate::core::corpus::TextCorpus;
pub use crate::core::dataset::ManagedDataset;
pub use crate::core::hashing::{hash_configuration, HashMethod};
pub use crate::core::table::Table;
pub use domain::model::{DatasetOptions, FileFormat, Record, RecipeArgs};
pub use domain::ports::{Dataset, DatasetSource, Fetcher, Samples, Storage};
pub use domain::recipe::RecipeRegistry;
pub use utils::error::{DatasetError, Result};
