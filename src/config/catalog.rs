use crate::adapters::http::{DownloadSettings, DEFAULT_USER_AGENT};
use crate::core::dataset::CACHE_ROOT_ENV;
use crate::domain::model::FileFormat;
use crate::utils::error::{DatasetError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SUPPORTED_FORMATS: [&str; 3] = ["csv", "tsv", "zip"];

/// Datasets known to the `dataset` command, loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub settings: SettingsConfig,
    #[serde(default)]
    pub datasets: Vec<DatasetEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsConfig {
    pub cache_root: Option<String>,
    pub user_agent: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetEntry {
    pub name: String,
    pub module: String,
    pub url: String,
    #[serde(default = "default_format")]
    pub format: String,
    pub delimiter: Option<String>,
    pub extension: Option<String>,
    pub description: Option<String>,
}

fn default_format() -> String {
    "csv".to_string()
}

impl CatalogConfig {
    /// 從 TOML 檔案載入目錄
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(DatasetError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析目錄
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;
        Ok(toml::from_str(&processed_content)?)
    }

    /// 替換環境變數 (例如 ${DATA_HOST})，未定義的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| DatasetError::config(format!("invalid substitution pattern: {}", e)))?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn find(&self, name: &str) -> Result<&DatasetEntry> {
        let wanted = name.to_lowercase();
        self.datasets
            .iter()
            .find(|d| d.name.to_lowercase() == wanted)
            .ok_or_else(|| DatasetError::DatasetNotFound {
                name: name.to_string(),
            })
    }

    /// Cache root: explicit override, then `$AI4SCR_CACHE_ROOT`, then the catalog
    /// setting, then `~/.ai4scr/datasets`.
    pub fn cache_root(&self, override_root: Option<&Path>) -> PathBuf {
        if let Some(root) = override_root {
            return root.to_path_buf();
        }
        if let Some(root) = std::env::var_os(CACHE_ROOT_ENV).filter(|v| !v.is_empty()) {
            return PathBuf::from(root);
        }
        match &self.settings.cache_root {
            Some(root) => expand_tilde(root),
            None => crate::core::dataset::default_cache_root(),
        }
    }

    pub fn download_settings(&self) -> DownloadSettings {
        let defaults = DownloadSettings::default();
        DownloadSettings {
            user_agent: self
                .settings
                .user_agent
                .clone()
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            timeout: match self.settings.timeout_seconds {
                Some(0) => None,
                Some(secs) => Some(Duration::from_secs(secs)),
                None => defaults.timeout,
            },
            retry_attempts: self
                .settings
                .retry_attempts
                .unwrap_or(defaults.retry_attempts),
            retry_delay: self
                .settings
                .retry_delay_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.retry_delay),
        }
    }

    pub fn validate_config(&self) -> Result<()> {
        if let Some(root) = &self.settings.cache_root {
            validation::validate_path("settings.cache_root", root)?;
        }
        if let Some(agent) = &self.settings.user_agent {
            validation::validate_non_empty_string("settings.user_agent", agent)?;
        }
        if let Some(attempts) = self.settings.retry_attempts {
            validation::validate_range("settings.retry_attempts", attempts, 0, 10)?;
        }
        if let Some(delay) = self.settings.retry_delay_seconds {
            validation::validate_range("settings.retry_delay_seconds", delay, 0, 600)?;
        }

        for entry in &self.datasets {
            entry.validate()?;
        }
        let lowered: Vec<String> = self.datasets.iter().map(|d| d.name.to_lowercase()).collect();
        validation::validate_unique("datasets.name", lowered.iter().map(String::as_str))?;

        Ok(())
    }
}

impl Validate for CatalogConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

impl DatasetEntry {
    pub fn file_format(&self) -> FileFormat {
        FileFormat::new(&self.format)
    }

    /// Field delimiter for tabular formats; tab for `tsv`, comma otherwise.
    pub fn delimiter_byte(&self) -> Result<u8> {
        match &self.delimiter {
            None if self.file_format().extension() == "tsv" => Ok(b'\t'),
            None => Ok(b','),
            Some(d) if d == "\\t" => Ok(b'\t'),
            Some(d) if d.len() == 1 => Ok(d.as_bytes()[0]),
            Some(d) => Err(DatasetError::InvalidConfigValueError {
                field: format!("datasets.{}.delimiter", self.name),
                value: d.clone(),
                reason: "Delimiter must be a single ASCII character".to_string(),
            }),
        }
    }
}

impl Validate for DatasetEntry {
    fn validate(&self) -> Result<()> {
        validation::validate_file_stem("datasets.name", &self.name)?;
        validation::validate_file_stem(&format!("datasets.{}.module", self.name), &self.module)?;
        validation::validate_url(&format!("datasets.{}.url", self.name), &self.url)?;
        validation::validate_one_of(
            &format!("datasets.{}.format", self.name),
            self.file_format().extension(),
            &SUPPORTED_FORMATS,
        )?;
        self.delimiter_byte()?;
        if let Some(extension) = &self.extension {
            let field = format!("datasets.{}.extension", self.name);
            validation::validate_file_stem(&field, extension)?;
        }
        Ok(())
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None if path == "~" => dirs::home_dir().unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}
