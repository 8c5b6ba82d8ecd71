use crate::domain::model::RecipeArgs;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

/// Catalog read when `--catalog` is not given.
pub const DEFAULT_CATALOG: &str = "datasets.toml";

#[derive(Debug, Clone, Parser)]
#[command(name = "dataset")]
#[command(about = "Download, process and cache AI4SCR datasets")]
#[command(version)]
pub struct Cli {
    /// TOML catalog describing the known datasets
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Overrides the cache root of the catalog and of AI4SCR_CACHE_ROOT
    #[arg(long, global = true)]
    pub cache_root: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,

    #[arg(long, global = true, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List catalog entries with their cache status
    List,
    /// Describe one dataset
    Info { name: String },
    /// Download and process a dataset, optionally applying a recipe
    Fetch {
        name: String,
        #[arg(long)]
        recipe: Option<String>,
        /// Recipe argument as key=value; the value is parsed as JSON when possible
        #[arg(long = "arg", value_name = "KEY=VALUE", value_parser = parse_recipe_arg)]
        args: Vec<(String, Value)>,
        /// Use an existing raw file instead of downloading
        #[arg(long)]
        path: Option<PathBuf>,
        #[arg(long)]
        force_download: bool,
        #[arg(long)]
        force_process: bool,
    },
    /// List the recipes available for a dataset
    Recipes { name: String },
    /// Hash a JSON or TOML configuration file
    Hash {
        file: PathBuf,
        #[arg(long, default_value = "sha256")]
        method: String,
    },
    /// Remove cached files of one dataset, or of every catalog dataset
    Clean { name: Option<String> },
}

/// Parses `key=value`. The value is read as JSON and falls back to a plain string.
pub fn parse_recipe_arg(s: &str) -> std::result::Result<(String, Value), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    let value =
        serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

pub fn recipe_args(args: &[(String, Value)]) -> RecipeArgs {
    args.iter().cloned().collect()
}

impl Validate for Cli {
    fn validate(&self) -> Result<()> {
        if let Some(root) = &self.cache_root {
            validation::validate_path("cache_root", &root.to_string_lossy())?;
        }
        if let Command::Fetch {
            recipe: Some(recipe),
            ..
        } = &self.command
        {
            validation::validate_file_stem("recipe", recipe)?;
        }
        Ok(())
    }
}
