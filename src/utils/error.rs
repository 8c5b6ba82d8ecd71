use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Download of {url} failed with status {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("Invalid path {path}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("File {path} does not exist")]
    FileNotFound { path: String },

    #[error("No recipe '{recipe}' registered. Available recipes: {available}")]
    RecipeNotFound { recipe: String, available: String },

    #[error("Recipe '{recipe}' is already registered")]
    DuplicateRecipe { recipe: String },

    #[error("Recipe '{recipe}' failed: {message}")]
    RecipeFailed { recipe: String, message: String },

    #[error("Hash method {method} not available. Available methods are {available}")]
    UnsupportedHashMethod { method: String, available: String },

    #[error("Index {index} out of range for dataset of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Dataset '{name}' is not in the catalog")]
    DatasetNotFound { name: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Storage,
    Configuration,
    Data,
    Usage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl DatasetError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::HttpError(_) | Self::DownloadFailed { .. } => ErrorCategory::Network,
            Self::IoError(_) | Self::InvalidPath { .. } | Self::FileNotFound { .. } => {
                ErrorCategory::Storage
            }
            Self::TomlError(_)
            | Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::UnsupportedHashMethod { .. } => ErrorCategory::Configuration,
            Self::ZipError(_)
            | Self::CsvError(_)
            | Self::SerializationError(_)
            | Self::RecipeFailed { .. }
            | Self::ProcessingError { .. } => ErrorCategory::Data,
            Self::RecipeNotFound { .. }
            | Self::DuplicateRecipe { .. }
            | Self::IndexOutOfRange { .. }
            | Self::DatasetNotFound { .. } => ErrorCategory::Usage,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::IndexOutOfRange { .. } => ErrorSeverity::Low,
            // 網路錯誤通常可重試
            Self::HttpError(_) => ErrorSeverity::Medium,
            Self::DownloadFailed { status, .. } if *status >= 500 || *status == 429 => {
                ErrorSeverity::Medium
            }
            Self::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    /// Whether retrying the same operation could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::HttpError(e) => e.is_timeout() || e.is_connect(),
            Self::DownloadFailed { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self.category() {
            ErrorCategory::Network => {
                "Check the dataset URL and your network connection, then retry".to_string()
            }
            ErrorCategory::Storage => {
                "Check that the cache directory exists and is writable".to_string()
            }
            ErrorCategory::Configuration => {
                "Review the catalog file and command line arguments".to_string()
            }
            ErrorCategory::Data => {
                "Re-run with --force-download or --force-process to rebuild the cache".to_string()
            }
            ErrorCategory::Usage => match self {
                Self::RecipeNotFound { .. } => {
                    "Use `dataset recipes <name>` to list the available recipes".to_string()
                }
                Self::DatasetNotFound { .. } => {
                    "Use `dataset list` to see the datasets in the catalog".to_string()
                }
                _ => "Check the command arguments".to_string(),
            },
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::HttpError(_) => "Could not reach the dataset server".to_string(),
            Self::DownloadFailed { url, status } => {
                format!("The server refused the download of {} (HTTP {})", url, status)
            }
            Self::FileNotFound { path } => format!("File not found: {}", path),
            other => other.to_string(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn recipe_failed(recipe: &str, message: impl Into<String>) -> Self {
        Self::RecipeFailed {
            recipe: recipe.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DatasetError>;
