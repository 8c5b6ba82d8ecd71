use crate::domain::ports::Fetcher;
use crate::utils::error::{DatasetError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "dataset-user";

/// Progress is logged every this many bytes when the server sends no content length.
const UNKNOWN_LENGTH_REPORT_BYTES: u64 = 8 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct DownloadSettings {
    pub user_agent: String,
    pub timeout: Option<Duration>,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Some(Duration::from_secs(300)),
            retry_attempts: 2,
            retry_delay: Duration::from_secs(1),
        }
    }
}

pub struct HttpDownloader {
    client: Client,
    settings: DownloadSettings,
}

impl HttpDownloader {
    pub fn new(settings: DownloadSettings) -> Result<Self> {
        let mut builder = Client::builder().user_agent(settings.user_agent.clone());
        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            settings,
        })
    }

    pub fn settings(&self) -> &DownloadSettings {
        &self.settings
    }

    async fn download_once(&self, url: &str, dest: &Path) -> Result<u64> {
        let part = part_path(dest);
        match self.stream_to(url, &part).await {
            Ok(written) => {
                fs::rename(&part, dest)?;
                Ok(written)
            }
            Err(e) => {
                // 確保不會留下下載到一半的檔案
                if part.is_file() {
                    let _ = fs::remove_file(&part);
                }
                Err(e)
            }
        }
    }

    async fn stream_to(&self, url: &str, part: &Path) -> Result<u64> {
        tracing::debug!("Making download request to: {}", url);
        let mut response = self.client.get(url).send().await?;
        let status = response.status();
        tracing::debug!("Download response status: {}", status);

        if !status.is_success() {
            return Err(DatasetError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let total = response.content_length();
        let mut file = File::create(part)?;
        let mut written: u64 = 0;
        let mut next_report = report_step(total);

        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk)?;
            written += chunk.len() as u64;

            if written >= next_report {
                match total {
                    Some(total) if total > 0 => tracing::debug!(
                        "⬇️  {}: {}/{} bytes ({}%)",
                        url,
                        written,
                        total,
                        written * 100 / total
                    ),
                    _ => tracing::debug!("⬇️  {}: {} bytes", url, written),
                }
                next_report = written + report_step(total);
            }
        }
        file.flush()?;

        if let Some(total) = total {
            if written < total {
                return Err(DatasetError::ProcessingError {
                    message: format!(
                        "connection closed after {} of {} bytes from {}",
                        written, total, url
                    ),
                });
            }
        }

        Ok(written)
    }
}

#[async_trait]
impl Fetcher for HttpDownloader {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64> {
        let parent = match dest.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !parent.is_dir() {
            return Err(DatasetError::InvalidPath {
                path: parent.display().to_string(),
                reason: "not a valid path to a directory".to_string(),
            });
        }

        let mut attempt = 0;
        loop {
            match self.download_once(url, dest).await {
                Ok(written) => {
                    tracing::info!("✅ Downloaded {} bytes from {}", written, url);
                    return Ok(written);
                }
                Err(e) if e.is_retryable() && attempt < self.settings.retry_attempts => {
                    attempt += 1;
                    tracing::warn!(
                        "⚠️ Download of {} failed ({}), retrying {}/{}",
                        url,
                        e,
                        attempt,
                        self.settings.retry_attempts
                    );
                    tokio::time::sleep(self.settings.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

fn report_step(total: Option<u64>) -> u64 {
    match total {
        Some(total) if total > 0 => (total / 10).max(1),
        _ => UNKNOWN_LENGTH_REPORT_BYTES,
    }
}
