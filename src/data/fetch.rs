//! Download snapshot files from the upstream time-series repository.

use std::fs;
use std::path::{Path, PathBuf};

use reqwest::StatusCode;
use reqwest::blocking::Client;

use crate::domain::{FileLayout, MetricTag};
use crate::error::AppError;

/// Raw-file base URL of the upstream time-series directory.
pub const DEFAULT_BASE_URL: &str =
    "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series";

/// Environment variable overriding `DEFAULT_BASE_URL`.
pub const BASE_URL_ENV: &str = "EPIGROWTH_DATA_URL";

/// What happened to each requested file.
#[derive(Debug, Clone, Default)]
pub struct FetchSummary {
    pub written: Vec<PathBuf>,
    /// Metrics the upstream does not publish for this layout (HTTP 404).
    pub unavailable: Vec<MetricTag>,
}

pub struct SnapshotClient {
    client: Client,
    base_url: String,
}

impl SnapshotClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Build a client from `EPIGROWTH_DATA_URL` (also read from `.env`).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let base_url = std::env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base_url)
    }

    pub fn url_for(&self, layout: FileLayout, tag: MetricTag) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), layout.file_name(tag))
    }

    /// Download every metric file for `layout` into `dir`.
    ///
    /// A 404 marks the metric unavailable (the US family has no recovered file);
    /// any other failure aborts.
    pub fn fetch_all(&self, layout: FileLayout, dir: &Path) -> Result<FetchSummary, AppError> {
        fs::create_dir_all(dir)
            .map_err(|e| AppError::new(4, format!("Failed to create data dir '{}': {e}", dir.display())))?;

        let mut summary = FetchSummary::default();
        for tag in MetricTag::ALL {
            let url = self.url_for(layout, tag);
            match self.fetch_text(&url)? {
                Some(body) => {
                    let path = dir.join(layout.file_name(tag));
                    fs::write(&path, body)
                        .map_err(|e| AppError::new(4, format!("Failed to write '{}': {e}", path.display())))?;
                    tracing::info!(metric = %tag, path = %path.display(), "snapshot downloaded");
                    summary.written.push(path);
                }
                None => {
                    tracing::warn!(metric = %tag, url = %url, "snapshot not published upstream");
                    summary.unavailable.push(tag);
                }
            }
        }
        Ok(summary)
    }

    fn fetch_text(&self, url: &str) -> Result<Option<String>, AppError> {
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| AppError::new(4, format!("Download of '{url}' failed: {e}")))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(AppError::new(
                4,
                format!("Download of '{url}' failed with status {}.", resp.status()),
            ));
        }

        let body = resp
            .text()
            .map_err(|e| AppError::new(4, format!("Failed to read response from '{url}': {e}")))?;
        Ok(Some(body))
    }
}
