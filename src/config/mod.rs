pub mod catalog;
#[cfg(feature = "cli")]
pub mod cli;

pub use catalog::{CatalogConfig, DatasetEntry, SettingsConfig};
#[cfg(feature = "cli")]
pub use cli::{Cli, Command};
